//! Type definitions for the commerce core

use std::time::Duration;

use crate::types::catalog::Currency;

pub mod catalog;
pub mod inventory;
pub mod orders;
pub mod promotions;

/// Policy constants for the order flow.
///
/// These are fixed store policy, not per-request knobs.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    /// Tax rate in basis points (800 = 8%).
    pub tax_rate_bps:            u64,
    /// Flat shipping fee in minor units.
    pub flat_shipping_fee:       u64,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: u64,
    /// Fallback order currency.
    pub default_currency:        Currency,
    /// Deadline for one placement transaction.
    pub transaction_timeout:     Duration,
    /// How long a stock hold lives before the sweep may release it.
    pub reservation_ttl:         Duration,
    /// Suggested cadence for the reservation-expiry sweep.
    pub sweep_interval:          Duration,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            tax_rate_bps:            800,
            flat_shipping_fee:       500,
            free_shipping_threshold: 10_000,
            default_currency:        Currency::usd(),
            transaction_timeout:     Duration::from_secs(10),
            reservation_ttl:         Duration::from_secs(30 * 60),
            sweep_interval:          Duration::from_secs(5 * 60),
        }
    }
}
