//! `minimart-auth`: authentication/authorization boundary for the back-office API.
//!
//! Token issuance (login/refresh) lives elsewhere; this crate only validates
//! bearer tokens and answers "may this principal do X". Decoupled from HTTP
//! and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
