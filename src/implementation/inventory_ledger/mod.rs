//! # Inventory Ledger
//!
//! Stock and reservation bookkeeping with an append-only change log.
//! All mutating operations run inside the caller's transaction; the
//! ledger holds no transaction boundary of its own.

mod service;
mod tests;

pub use service::InventoryLedger;
