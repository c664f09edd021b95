use minimart_inventory::is_low_stock;

use crate::ledger::{LedgerStore, LedgerStoreError, ProductStock};

/// Flags products whose stock is at or below their threshold.
#[derive(Debug, Clone)]
pub struct LowStockEvaluator<S> {
    store: S,
}

impl<S> LowStockEvaluator<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Low-stock subset of the stock listing, in the same name order. Not paginated.
    pub async fn list_low_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError> {
        let rows = self.store.list_with_stock().await?;
        Ok(rows
            .into_iter()
            .filter(|row| is_low_stock(row.current_stock, row.product.low_stock_threshold))
            .collect())
    }
}
