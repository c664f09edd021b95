use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use minimart_core::{DomainError, ProductId};

/// Catalog product as seen by the stock ledger.
///
/// `deleted_at` is the catalog's soft-delete marker; a product with it set is
/// treated as gone by every inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub low_stock_threshold: i64,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// New active product with no barcode and a zero threshold (catalog defaults).
    pub fn new(id: ProductId, name: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sku: sku.into(),
            barcode: None,
            low_stock_threshold: 0,
            is_active: true,
            deleted_at: None,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn deleted_at(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check the catalog invariants the ledger relies on.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if self.low_stock_threshold < 0 {
            return Err(DomainError::validation(
                "low_stock_threshold must be zero or greater",
            ));
        }
        Ok(())
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary::from(self)
    }
}

/// Product identity attached to movement listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub low_stock_threshold: i64,
    pub is_active: bool,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            sku: p.sku.clone(),
            barcode: p.barcode.clone(),
            low_stock_threshold: p.low_stock_threshold,
            is_active: p.is_active,
        }
    }
}
