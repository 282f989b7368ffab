//! # Order Flow
//!
//! The order placement transaction, the status machine, the payment
//! event sink, and the reservation-expiry sweep.

mod service;
mod sweep;

pub use service::OrderService;
pub use sweep::{ReservationSweeper, SweepReport};
