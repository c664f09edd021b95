use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use minimart_core::{MovementId, ProductId};
use minimart_inventory::{NewMovement, StockMovement, stock_from_movements};
use minimart_products::Product;

use super::{
    LedgerStore, LedgerStoreError, LedgerTx, MovementRecord, Page, ProductCatalog, ProductStock,
    ensure_same_product,
};

#[derive(Debug, Default)]
struct LedgerState {
    products: BTreeMap<ProductId, Product>,
    movements: Vec<StockMovement>,
}

impl LedgerState {
    fn live_product(&self, product_id: ProductId) -> Option<&Product> {
        self.products.get(&product_id).filter(|p| !p.is_deleted())
    }

    fn stock_of(&self, product_id: ProductId) -> i64 {
        stock_from_movements(self.movements.iter().filter(|m| m.product_id == product_id))
    }
}

/// In-memory stock ledger.
///
/// Intended for tests/dev. Each product has its own async mutex, held by the
/// transaction scope for its whole lifetime, so adjustments on one product
/// are serialized while other products proceed independently.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    product_locks: Mutex<HashMap<ProductId, Arc<AsyncMutex<()>>>>,
    next_movement_id: Arc<AtomicI64>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a catalog product.
    pub fn upsert_product(&self, product: Product) -> Result<(), LedgerStoreError> {
        product
            .validate()
            .map_err(|e| LedgerStoreError::InvalidProduct(e.to_string()))?;
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.products.insert(product.id, product);
        Ok(())
    }

    fn ensure_live(&self, product_id: ProductId) -> Result<(), LedgerStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        match state.live_product(product_id) {
            Some(_) => Ok(()),
            None => Err(LedgerStoreError::ProductNotFound(product_id)),
        }
    }

    fn lock_for(&self, product_id: ProductId) -> Result<Arc<AsyncMutex<()>>, LedgerStoreError> {
        let mut locks = self.product_locks.lock().map_err(|_| poisoned())?;
        Ok(locks.entry(product_id).or_default().clone())
    }
}

fn poisoned() -> LedgerStoreError {
    LedgerStoreError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Tx = InMemoryLedgerTx;

    async fn begin_adjustment(&self, product_id: ProductId) -> Result<Self::Tx, LedgerStoreError> {
        // Unknown ids never get a lock entry.
        self.ensure_live(product_id)?;
        let lock = self.lock_for(product_id)?;
        let guard = lock.lock_owned().await;

        // The product may have been deleted while we waited.
        self.ensure_live(product_id)?;

        Ok(InMemoryLedgerTx {
            product_id,
            state: Arc::clone(&self.state),
            next_movement_id: Arc::clone(&self.next_movement_id),
            pending: Vec::new(),
            _guard: guard,
        })
    }

    async fn current_stock(&self, product_id: ProductId) -> Result<i64, LedgerStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.stock_of(product_id))
    }

    async fn list_with_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut rows: Vec<ProductStock> = state
            .products
            .values()
            .filter(|p| !p.is_deleted())
            .map(|p| ProductStock {
                product: p.clone(),
                // Zero-movement products report 0 explicitly.
                current_stock: state.stock_of(p.id),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.product
                .name
                .cmp(&b.product.name)
                .then(a.product.id.cmp(&b.product.id))
        });
        Ok(rows)
    }

    async fn list_movements(&self, page: Page) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut rows: Vec<MovementRecord> = state
            .movements
            .iter()
            .filter(|m| !m.is_deleted())
            .map(|m| MovementRecord {
                movement: m.clone(),
                product: state.live_product(m.product_id).map(Product::summary),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.movement
                .created_at
                .cmp(&a.movement.created_at)
                .then(b.movement.id.cmp(&a.movement.id))
        });
        Ok(page.apply(rows))
    }
}

#[async_trait]
impl ProductCatalog for InMemoryLedgerStore {
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, LedgerStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.live_product(product_id).cloned())
    }
}

/// Transaction scope over one product of an `InMemoryLedgerStore`.
///
/// Appends are buffered and only pushed to the shared log on `commit`.
#[derive(Debug)]
pub struct InMemoryLedgerTx {
    product_id: ProductId,
    state: Arc<RwLock<LedgerState>>,
    next_movement_id: Arc<AtomicI64>,
    pending: Vec<StockMovement>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    fn product_id(&self) -> ProductId {
        self.product_id
    }

    async fn current_stock(&mut self) -> Result<i64, LedgerStoreError> {
        let committed = {
            let state = self.state.read().map_err(|_| poisoned())?;
            state.stock_of(self.product_id)
        };
        Ok(committed.saturating_add(stock_from_movements(&self.pending)))
    }

    async fn append(&mut self, movement: NewMovement) -> Result<StockMovement, LedgerStoreError> {
        ensure_same_product(self.product_id, &movement)?;
        let id = self.next_movement_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = movement.into_stored(MovementId::from_raw(id), Utc::now());
        self.pending.push(stored.clone());
        Ok(stored)
    }

    async fn commit(mut self) -> Result<(), LedgerStoreError> {
        let pending = std::mem::take(&mut self.pending);
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.movements.extend(pending);
        Ok(())
    }
}

impl Drop for InMemoryLedgerTx {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(
                product_id = %self.product_id,
                discarded = self.pending.len(),
                "ledger transaction rolled back"
            );
        }
    }
}
