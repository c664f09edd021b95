use minimart_core::ProductId;

use crate::ledger::{LedgerStore, LedgerStoreError, MovementRecord, Page, ProductStock};

/// Current stock derived from the movement log.
#[derive(Debug, Clone)]
pub struct StockProjection<S> {
    store: S,
}

impl<S> StockProjection<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Signed sum of the product's live movements. Unknown products report 0;
    /// the value is never clamped.
    pub async fn current_stock(&self, product_id: ProductId) -> Result<i64, LedgerStoreError> {
        self.store.current_stock(product_id).await
    }

    /// Every live product with its stock, including products with no movements.
    pub async fn list_with_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError> {
        self.store.list_with_stock().await
    }

    /// Movement history joined with product summaries, newest first.
    pub async fn list_movements(&self, page: Page) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        self.store.list_movements(page).await
    }
}
