use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::{AuditEntry, AuditError, AuditSink};

/// Audit sink writing to the `logs` table. `details` is stored as JSON text.
#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    pool: Arc<PgPool>,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    #[instrument(skip(self, entry), fields(action = %entry.action), err)]
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let details = match &entry.details {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(serde_json::to_string(other).map_err(|e| AuditError::Encode(e.to_string()))?),
        };

        sqlx::query("INSERT INTO logs (user_id, action, details, created_at) VALUES ($1, $2, $3, $4)")
            .bind(entry.user_id.map(|id| id.get()))
            .bind(&entry.action)
            .bind(details)
            .bind(entry.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| AuditError::Storage(format!("insert into logs failed: {e}")))?;
        Ok(())
    }
}
