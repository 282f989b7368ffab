//! # Implementation
//!
//! The four storefront components. Each owns one concern and takes a
//! [`StoreTx`](crate::store::StoreTx) so its writes join the caller's
//! transaction.

pub mod coupon_engine;
pub mod deal_resolver;
pub mod inventory_ledger;
pub mod order_flow;

pub use coupon_engine::{CouponEngine, PricedLine};
pub use deal_resolver::DealResolver;
pub use inventory_ledger::InventoryLedger;
pub use order_flow::{OrderService, ReservationSweeper, SweepReport};
