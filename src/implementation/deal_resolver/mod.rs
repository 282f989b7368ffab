//! # Deal Resolver
//!
//! Time-boxed product discounts: effective-price resolution, window
//! overlap enforcement, usage caps, and deal templates.

mod service;
mod tests;

pub use service::DealResolver;
