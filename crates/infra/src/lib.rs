//! Infrastructure layer: ledger stores, audit sinks, read-side views, the
//! adjustment service and configuration.

pub mod adjustment;
pub mod audit;
pub mod config;
pub mod ledger;
pub mod projections;


pub use adjustment::{AdjustError, AdjustmentOutcome, AdjustmentService};
pub use audit::{AuditEntry, AuditError, AuditSink, InMemoryAuditSink, PostgresAuditSink};
pub use config::{AppConfig, ConfigError};
pub use ledger::{
    InMemoryLedgerStore, LedgerStore, LedgerStoreError, LedgerTx, MovementRecord, Page,
    PostgresLedgerStore, ProductCatalog, ProductStock,
};
pub use projections::{LowStockEvaluator, StockProjection};
