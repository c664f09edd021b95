//! `minimart-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the back-office crates
//! (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{MovementId, ProductId, UserId};
