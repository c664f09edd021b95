//! Read-side views over the stock ledger.
//!
//! Nothing here is cached: every query recomputes stock from the movement log
//! through the store, so there is no running total to drift or rebuild.

pub mod low_stock;
pub mod stock;

pub use low_stock::LowStockEvaluator;
pub use stock::StockProjection;
