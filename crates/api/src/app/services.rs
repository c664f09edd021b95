//! Infrastructure wiring: which ledger store and audit sink back the API.

use std::sync::Arc;
use std::time::Duration;

use minimart_core::UserId;
use minimart_infra::{
    AdjustError, AdjustmentOutcome, AdjustmentService, AppConfig, AuditEntry, AuditError,
    AuditSink, InMemoryAuditSink, InMemoryLedgerStore, LedgerStoreError, LowStockEvaluator,
    MovementRecord, Page, PostgresAuditSink, PostgresLedgerStore, ProductStock, StockProjection,
};
use minimart_inventory::RawAdjustment;

type InMemoryAdjuster = AdjustmentService<Arc<InMemoryLedgerStore>, Arc<InMemoryAuditSink>>;
type PersistentAdjuster = AdjustmentService<Arc<PostgresLedgerStore>, Arc<PostgresAuditSink>>;

pub enum AppServices {
    InMemory {
        store: Arc<InMemoryLedgerStore>,
        audit: Arc<InMemoryAuditSink>,
        adjuster: InMemoryAdjuster,
        projection: StockProjection<Arc<InMemoryLedgerStore>>,
        low_stock: LowStockEvaluator<Arc<InMemoryLedgerStore>>,
    },
    Persistent {
        audit: Arc<PostgresAuditSink>,
        adjuster: PersistentAdjuster,
        projection: StockProjection<Arc<PostgresLedgerStore>>,
        low_stock: LowStockEvaluator<Arc<PostgresLedgerStore>>,
    },
}

impl AppServices {
    /// In-memory stores (dev/tests). Products are seeded through `in_memory_store()`.
    pub fn in_memory(adjust_timeout: Duration) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        AppServices::InMemory {
            adjuster: AdjustmentService::new(store.clone(), audit.clone(), adjust_timeout),
            projection: StockProjection::new(store.clone()),
            low_stock: LowStockEvaluator::new(store.clone()),
            store,
            audit,
        }
    }

    /// Postgres-backed stores. Creates the schema if it is missing.
    pub async fn persistent(
        database_url: &str,
        max_connections: u32,
        adjust_timeout: Duration,
    ) -> Result<Self, LedgerStoreError> {
        let store = Arc::new(PostgresLedgerStore::connect(database_url, max_connections).await?);
        store.ensure_schema().await?;
        let audit = Arc::new(PostgresAuditSink::new(store.pool().clone()));

        Ok(AppServices::Persistent {
            adjuster: AdjustmentService::new(store.clone(), audit.clone(), adjust_timeout),
            projection: StockProjection::new(store.clone()),
            low_stock: LowStockEvaluator::new(store),
            audit,
        })
    }

    pub fn in_memory_store(&self) -> Option<&Arc<InMemoryLedgerStore>> {
        match self {
            AppServices::InMemory { store, .. } => Some(store),
            AppServices::Persistent { .. } => None,
        }
    }

    pub fn in_memory_audit(&self) -> Option<&Arc<InMemoryAuditSink>> {
        match self {
            AppServices::InMemory { audit, .. } => Some(audit),
            AppServices::Persistent { .. } => None,
        }
    }

    pub async fn list_with_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError> {
        match self {
            AppServices::InMemory { projection, .. } => projection.list_with_stock().await,
            AppServices::Persistent { projection, .. } => projection.list_with_stock().await,
        }
    }

    pub async fn list_low_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError> {
        match self {
            AppServices::InMemory { low_stock, .. } => low_stock.list_low_stock().await,
            AppServices::Persistent { low_stock, .. } => low_stock.list_low_stock().await,
        }
    }

    pub async fn list_movements(&self, page: Page) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        match self {
            AppServices::InMemory { projection, .. } => projection.list_movements(page).await,
            AppServices::Persistent { projection, .. } => projection.list_movements(page).await,
        }
    }

    pub async fn adjust(
        &self,
        raw: RawAdjustment,
        acting_user: Option<UserId>,
    ) -> Result<AdjustmentOutcome, AdjustError> {
        match self {
            AppServices::InMemory { adjuster, .. } => adjuster.adjust_raw(raw, acting_user).await,
            AppServices::Persistent { adjuster, .. } => adjuster.adjust_raw(raw, acting_user).await,
        }
    }

    pub async fn record_audit(&self, entry: AuditEntry) -> Result<(), AuditError> {
        match self {
            AppServices::InMemory { audit, .. } => audit.record(entry).await,
            AppServices::Persistent { audit, .. } => audit.record(entry).await,
        }
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, LedgerStoreError> {
    if config.use_persistent_stores {
        let database_url = config.database_url.as_deref().ok_or_else(|| {
            LedgerStoreError::Storage(
                "DATABASE_URL must be set when USE_PERSISTENT_STORES=true".to_string(),
            )
        })?;
        tracing::info!(max_connections = config.db_max_connections, "using Postgres ledger store");
        return AppServices::persistent(database_url, config.db_max_connections, config.adjust_timeout)
            .await;
    }

    tracing::warn!("using in-memory ledger store; data is lost on restart");
    Ok(AppServices::in_memory(config.adjust_timeout))
}
