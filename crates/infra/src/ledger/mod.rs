//! Stock ledger persistence boundary.
//!
//! The ledger is an append-only log of `StockMovement` rows. Stores expose two
//! kinds of access:
//!
//! - committed reads (`current_stock`, `list_with_stock`, `list_movements`)
//! - a per-product transaction scope (`LedgerTx`) used by the adjustment
//!   service for its read-check-append sequence
//!
//! A transaction scope holds the product's write lock from `begin_adjustment`
//! until it is committed or dropped. Dropping it without `commit` rolls back.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use minimart_core::ProductId;
use minimart_inventory::{NewMovement, StockMovement};
use minimart_products::{Product, ProductSummary};

pub use in_memory::{InMemoryLedgerStore, InMemoryLedgerTx};
pub use postgres::{PgLedgerTx, PostgresLedgerStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerStoreError {
    /// The product does not exist (or is soft-deleted).
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The row was rejected by a store-level constraint.
    #[error("invalid movement: {0}")]
    InvalidMovement(String),

    /// A catalog product failed validation on insert.
    #[error("invalid product: {0}")]
    InvalidProduct(String),

    /// Conflicting concurrent write detected by the backend.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    /// Connection, query or lock failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// A product together with its projected stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductStock {
    #[serde(flatten)]
    pub product: Product,
    pub current_stock: i64,
}

/// A movement row joined with a summary of its (live) product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementRecord {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub product: Option<ProductSummary>,
}

/// Window over the newest-first movement listing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    /// The whole listing.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(limit: Option<u32>, offset: u32) -> Self {
        Self { limit, offset }
    }

    pub(crate) fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset as usize);
        match self.limit {
            Some(limit) => iter.take(limit as usize).collect(),
            None => iter.collect(),
        }
    }
}

/// Append-only stock ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx;

    /// Open a transaction scope on one product, waiting for any other scope
    /// on the same product to finish first.
    ///
    /// Fails with `ProductNotFound` if the product is missing or soft-deleted.
    async fn begin_adjustment(&self, product_id: ProductId) -> Result<Self::Tx, LedgerStoreError>;

    /// Committed stock of a product. Unknown products report 0.
    async fn current_stock(&self, product_id: ProductId) -> Result<i64, LedgerStoreError>;

    /// Every live product with its stock, ordered by name (ties by id).
    async fn list_with_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError>;

    /// Live movements, newest first (ties by id descending).
    async fn list_movements(&self, page: Page) -> Result<Vec<MovementRecord>, LedgerStoreError>;
}

/// Per-product transaction scope.
#[async_trait]
pub trait LedgerTx: Send {
    fn product_id(&self) -> ProductId;

    /// Stock as seen from inside the scope (committed rows plus this scope's appends).
    async fn current_stock(&mut self) -> Result<i64, LedgerStoreError>;

    /// Append a movement. Only visible to other readers after `commit`.
    async fn append(&mut self, movement: NewMovement) -> Result<StockMovement, LedgerStoreError>;

    async fn commit(self) -> Result<(), LedgerStoreError>;
}

/// Lookup of catalog products (soft-deleted products are reported as absent).
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, LedgerStoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    type Tx = S::Tx;

    async fn begin_adjustment(&self, product_id: ProductId) -> Result<Self::Tx, LedgerStoreError> {
        (**self).begin_adjustment(product_id).await
    }

    async fn current_stock(&self, product_id: ProductId) -> Result<i64, LedgerStoreError> {
        (**self).current_stock(product_id).await
    }

    async fn list_with_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError> {
        (**self).list_with_stock().await
    }

    async fn list_movements(&self, page: Page) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        (**self).list_movements(page).await
    }
}

#[async_trait]
impl<S> ProductCatalog for Arc<S>
where
    S: ProductCatalog + ?Sized,
{
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, LedgerStoreError> {
        (**self).find_product(product_id).await
    }
}

/// Reject a movement aimed at a different product than the scope's.
pub(crate) fn ensure_same_product(
    scope: ProductId,
    movement: &NewMovement,
) -> Result<(), LedgerStoreError> {
    if movement.product_id != scope {
        return Err(LedgerStoreError::InvalidMovement(format!(
            "movement for product {} appended inside a scope for product {}",
            movement.product_id, scope
        )));
    }
    Ok(())
}
