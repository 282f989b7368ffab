//! # Coupon Engine
//!
//! Coupon validation, discount computation against (possibly scoped)
//! cart lines, and redemption tracking.

mod service;

pub use service::{CouponEngine, PricedLine};
