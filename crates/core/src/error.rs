//! Domain error model.

use thiserror::Error;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (bad input, stock
/// rules). Storage and transport failures belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An outgoing movement would drive stock below zero.
    #[error("stock cannot go negative (requested {requested}, available {available})")]
    InsufficientStock { requested: i64, available: i64 },

    /// An identifier was invalid (e.g. zero or negative surrogate key).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn insufficient_stock(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_both_amounts() {
        let err = DomainError::insufficient_stock(5, 2);
        assert_eq!(
            err.to_string(),
            "stock cannot go negative (requested 5, available 2)"
        );
    }
}
