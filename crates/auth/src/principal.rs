use minimart_core::UserId;

use crate::{JwtClaims, Permission, Role};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve permissions for the role carried in already-validated claims.
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username.clone(),
            role: claims.role.clone(),
            permissions: claims.role.permissions(),
        }
    }
}
