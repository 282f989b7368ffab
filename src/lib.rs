//! # Storefront Core
//!
//! Order-placement core for a storefront: inventory ledger, time-boxed
//! deals, coupons, and the serializable order transaction that ties them
//! together.

#![allow(clippy::unnecessary_literal_bound)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod implementation;
pub mod store;
pub mod types;

// Re-exports for public API
pub use errors::{CommerceError, CommerceResult};
pub use implementation::{
    CouponEngine, DealResolver, InventoryLedger, OrderService, ReservationSweeper,
};
pub use store::{CommerceStore, StoreTx};
pub use types::CommerceConfig;
