//! Inventory stock-ledger domain module.
//!
//! This crate contains the ledger's business rules, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage): movement shapes,
//! stock aggregation, the adjustment decision and the low-stock rule.

pub mod adjustment;
pub mod low_stock;
pub mod movement;

pub use adjustment::{
    ADJUST_ACTION, AdjustStock, AdjustmentDecision, AdjustmentRecorded, RawAdjustment, decide,
};
pub use low_stock::is_low_stock;
pub use movement::{
    Direction, MANUAL_REFERENCE, MovementType, NewMovement, Quantity, StockMovement,
    stock_from_movements,
};
