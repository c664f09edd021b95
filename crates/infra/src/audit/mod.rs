//! Audit trail sink (the `logs` table).
//!
//! Audit writes are best-effort from the caller's point of view: a failed
//! `record` is logged and never undoes the business write it describes.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use minimart_core::UserId;

pub use in_memory::InMemoryAuditSink;
pub use postgres::PostgresAuditSink;

/// Action recorded when a caller is denied access to a route.
pub const FORBIDDEN_ACCESS_ACTION: &str = "FORBIDDEN_ACCESS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: Option<UserId>,
    pub action: String,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(user_id: Option<UserId>, action: impl Into<String>, details: JsonValue) -> Self {
        Self {
            user_id,
            action: action.into(),
            details,
            created_at: Utc::now(),
        }
    }

    pub fn forbidden_access(user_id: Option<UserId>, path: &str, role: &str) -> Self {
        Self::new(
            user_id,
            FORBIDDEN_ACCESS_ACTION,
            JsonValue::String(format!("Attempt to access {path} with role {role}")),
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("failed to encode audit details: {0}")]
    Encode(String),
    #[error("audit storage failure: {0}")]
    Storage(String),
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

#[async_trait]
impl<A> AuditSink for Arc<A>
where
    A: AuditSink + ?Sized,
{
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_access_message_names_path_and_role() {
        let entry = AuditEntry::forbidden_access(Some(UserId::from_raw(4)), "/inventory", "Cashier");
        assert_eq!(entry.action, "FORBIDDEN_ACCESS");
        assert_eq!(
            entry.details,
            JsonValue::String("Attempt to access /inventory with role Cashier".to_string())
        );
        assert_eq!(entry.user_id, Some(UserId::from_raw(4)));
    }
}
