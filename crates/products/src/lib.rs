//! Product catalog types (read-mostly collaborator of the stock ledger).
//!
//! Product CRUD lives outside this workspace; the ledger only needs product
//! identity, display fields and the low-stock threshold. No IO here.

pub mod product;

pub use product::{Product, ProductSummary};
