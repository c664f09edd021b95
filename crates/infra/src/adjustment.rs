//! Stock adjustment pipeline (the ledger's only writer).
//!
//! ```text
//! AdjustStock (validated)
//!   ↓
//! 1. Check the product exists in the catalog
//!   ↓
//! 2. Open the per-product transaction scope (waits for other writers on the product)
//!   ↓
//! 3. Read `before` inside the scope
//!   ↓
//! 4. Decide (pure; rejects OUT movements that would go below zero)
//!   ↓
//! 5. Append the movement
//!   ↓
//! 6. Commit
//!   ↓
//! 7. Record the `inventory.adjust` audit entry (best effort)
//! ```
//!
//! Steps 1 to 5 run under `adjust_timeout`. Any failure there drops the scope,
//! which rolls the transaction back: nothing is written. The commit itself is
//! never cancelled by the timeout, so a reported timeout always means nothing
//! was written.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use minimart_core::{DomainError, ProductId, UserId};
use minimart_inventory::{
    ADJUST_ACTION, AdjustStock, AdjustmentRecorded, RawAdjustment, StockMovement, decide,
};

use crate::audit::{AuditEntry, AuditSink};
use crate::ledger::{LedgerStore, LedgerStoreError, LedgerTx, ProductCatalog};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdjustError {
    /// Malformed request; rejected before any transaction was opened.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An OUT movement would leave the product with negative stock.
    #[error("Stock cannot go negative (requested {requested}, available {available})")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("{0}")]
    NotFound(String),

    /// Read or append failure (nothing written), or a failed commit.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The adjustment did not finish in time. Nothing was written.
    #[error("stock adjustment timed out after {0:?}")]
    Timeout(Duration),
}

impl From<DomainError> for AdjustError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                AdjustError::Validation(msg)
            }
            DomainError::InsufficientStock {
                requested,
                available,
            } => AdjustError::InsufficientStock {
                requested,
                available,
            },
        }
    }
}

impl From<LedgerStoreError> for AdjustError {
    fn from(value: LedgerStoreError) -> Self {
        match value {
            LedgerStoreError::ProductNotFound(id) => AdjustError::NotFound(product_not_found(id)),
            other => AdjustError::Storage(other.to_string()),
        }
    }
}

fn product_not_found(id: ProductId) -> String {
    format!("product {id} not found")
}

/// Result of a committed adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustmentOutcome {
    pub movement: StockMovement,
    pub before: i64,
    pub after: i64,
}

/// Applies manual stock adjustments against a ledger store and records them
/// in the audit trail.
#[derive(Debug)]
pub struct AdjustmentService<S, A> {
    store: S,
    audit: A,
    timeout: Duration,
}

impl<S, A> AdjustmentService<S, A> {
    pub fn new(store: S, audit: A, timeout: Duration) -> Self {
        Self {
            store,
            audit,
            timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }
}

impl<S, A> AdjustmentService<S, A>
where
    S: LedgerStore + ProductCatalog,
    A: AuditSink,
{
    /// Validate a raw request, then adjust.
    pub async fn adjust_raw(
        &self,
        raw: RawAdjustment,
        acting_user: Option<UserId>,
    ) -> Result<AdjustmentOutcome, AdjustError> {
        let command = AdjustStock::parse(raw, acting_user)?;
        self.adjust(command).await
    }

    /// Apply one adjustment atomically.
    ///
    /// The movement commit is authoritative: a failure to write the audit entry
    /// afterwards is logged and does not affect the returned outcome.
    pub async fn adjust(&self, command: AdjustStock) -> Result<AdjustmentOutcome, AdjustError> {
        let outcome = match self.apply(&command).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(
                    product_id = %command.product_id,
                    direction = %command.direction,
                    quantity = command.quantity.get(),
                    error = %err,
                    "stock adjustment rejected"
                );
                return Err(err);
            }
        };

        tracing::info!(
            product_id = %command.product_id,
            movement_id = %outcome.movement.id,
            direction = %command.direction,
            quantity = command.quantity.get(),
            before = outcome.before,
            after = outcome.after,
            "stock adjusted"
        );

        self.record_audit(&command, &outcome).await;
        Ok(outcome)
    }

    async fn apply(&self, command: &AdjustStock) -> Result<AdjustmentOutcome, AdjustError> {
        let (tx, outcome) = match tokio::time::timeout(self.timeout, self.prepare(command)).await {
            Ok(prepared) => prepared?,
            Err(_) => return Err(AdjustError::Timeout(self.timeout)),
        };

        // Once COMMIT is sent its result is authoritative; it runs unbounded.
        tx.commit().await?;
        Ok(outcome)
    }

    /// Lock, read, decide and append. Returns the still-open scope.
    async fn prepare(&self, command: &AdjustStock) -> Result<(S::Tx, AdjustmentOutcome), AdjustError> {
        let product_id = command.product_id;
        if self.store.find_product(product_id).await?.is_none() {
            return Err(AdjustError::NotFound(product_not_found(product_id)));
        }

        let mut tx = self.store.begin_adjustment(product_id).await?;
        let before = tx.current_stock().await?;
        let decision = decide(before, command)?;
        let movement = tx.append(decision.movement).await?;

        let outcome = AdjustmentOutcome {
            movement,
            before: decision.before,
            after: decision.after,
        };
        Ok((tx, outcome))
    }

    async fn record_audit(&self, command: &AdjustStock, outcome: &AdjustmentOutcome) {
        let recorded = AdjustmentRecorded {
            product_id: command.product_id,
            movement_id: outcome.movement.id,
            movement_type: outcome.movement.movement_type,
            direction: outcome.movement.direction,
            quantity: outcome.movement.quantity,
            before: outcome.before,
            after: outcome.after,
            reason: outcome.movement.reason.clone(),
        };

        let details = match serde_json::to_value(&recorded) {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(movement_id = %outcome.movement.id, "failed to encode audit details: {e}");
                return;
            }
        };

        let entry = AuditEntry::new(command.acting_user, ADJUST_ACTION, details);
        if let Err(e) = self.audit.record(entry).await {
            tracing::warn!(
                movement_id = %outcome.movement.id,
                error = %e,
                "audit entry for stock adjustment was not written"
            );
        }
    }
}
