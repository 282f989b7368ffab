//! # Promotion Types
//!
//! Time-boxed product deals, deal templates, and coupon codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::catalog::{CategoryId, CustomerId, ProductId};

// ============================================================================
// DEALS
// ============================================================================

/// Deal identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl DealId {
    /// Creates a new deal ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new unique deal ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("deal-{}", uuid::Uuid::new_v4()))
    }
}

impl std::fmt::Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deal classification. One product may carry at most one deal of each
/// type per time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealType {
    /// Short flash sale.
    Flash,
    /// Trending-product promotion.
    Trending,
    /// Deal of the day.
    DealOfDay,
    /// Clearance discount.
    Clearance,
}

impl std::fmt::Display for DealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Flash => "flash",
            Self::Trending => "trending",
            Self::DealOfDay => "deal-of-day",
            Self::Clearance => "clearance",
        };
        write!(f, "{}", name)
    }
}

/// Derived deal lifecycle status. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealStatus {
    /// `now < start`.
    Upcoming,
    /// `start <= now <= end`.
    Active,
    /// `now > end`.
    Ended,
}

/// Optional usage caps on a deal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealLimits {
    /// Cap on total redemptions across all customers.
    pub max_total_usage: Option<u32>,
    /// Cap on redemptions per customer.
    pub max_user_usage:  Option<u32>,
}

/// Time-boxed percentage discount on a single product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDeal {
    /// Deal ID.
    pub id:               DealId,
    /// Discounted product.
    pub product_id:       ProductId,
    /// Deal classification.
    pub deal_type:        DealType,
    /// Discount percentage (0-100).
    pub discount_percent: u64,
    /// Window start (inclusive).
    pub start_time:       DateTime<Utc>,
    /// Window end (inclusive).
    pub end_time:         DateTime<Utc>,
    /// Usage caps, if any.
    pub limits:           DealLimits,
    /// Total redemptions so far.
    pub current_usage:    u32,
    /// Creation timestamp, used as the overlap tie-breaker.
    pub created_at:       DateTime<Utc>,
}

impl ProductDeal {
    /// Derived status at `at`.
    #[must_use]
    pub fn status(&self, at: DateTime<Utc>) -> DealStatus {
        if at < self.start_time {
            DealStatus::Upcoming
        } else if at > self.end_time {
            DealStatus::Ended
        } else {
            DealStatus::Active
        }
    }

    /// Whether the inclusive window contains `at`.
    #[must_use]
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.status(at) == DealStatus::Active
    }

    /// Whether the inclusive windows of two deals overlap.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time <= end && start <= self.end_time
    }

    /// Applies the discount to a base price in minor units.
    #[must_use]
    pub fn apply(&self, base: u64) -> u64 {
        base.saturating_sub(base.saturating_mul(self.discount_percent) / 100)
    }
}

/// Template identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

impl TemplateId {
    /// Generates a new unique template ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("tmpl-{}", uuid::Uuid::new_v4()))
    }
}

/// Reusable deal definition, decoupled from any product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealTemplate {
    /// Template ID.
    pub id:               TemplateId,
    /// Template name.
    pub name:             String,
    /// Deal classification to instantiate with.
    pub deal_type:        DealType,
    /// Discount percentage (0-100).
    pub discount_percent: u64,
    /// Window length of instantiated deals.
    pub duration:         std::time::Duration,
    /// Usage caps applied to instantiated deals.
    pub limits:           DealLimits,
}

// ============================================================================
// COUPONS
// ============================================================================

/// Coupon code, unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(pub String);

impl CouponCode {
    /// Creates a new coupon code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
}

impl std::fmt::Display for CouponCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coupon discount kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponType {
    /// Percentage off the (possibly scoped) subtotal.
    Percentage,
    /// Fixed amount off, never exceeding the subtotal.
    FixedAmount,
    /// Shipping-fee discount.
    FreeShipping,
}

/// Coupon administrative status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CouponStatus {
    /// Redeemable.
    #[default]
    Active,
    /// Switched off by staff.
    Disabled,
}

/// User-entered discount code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique code.
    pub code:             CouponCode,
    /// Discount kind.
    pub coupon_type:      CouponType,
    /// Percentage for `Percentage`, minor units otherwise.
    pub value:            u64,
    /// Minimum order subtotal to qualify.
    pub minimum_purchase: u64,
    /// Cap on total redemptions, if any.
    pub usage_limit:      Option<u32>,
    /// Redemptions so far.
    pub usage_count:      u32,
    /// Cap on redemptions per customer, if any.
    pub per_user_limit:   Option<u32>,
    /// Validity start (inclusive).
    pub start_date:       DateTime<Utc>,
    /// Validity end (inclusive).
    pub end_date:         DateTime<Utc>,
    /// Administrative status.
    pub status:           CouponStatus,
    /// Scope to these categories, when non-empty.
    pub category_ids:     Vec<CategoryId>,
    /// Scope to these products, when non-empty.
    pub product_ids:      Vec<ProductId>,
}

impl Coupon {
    /// Whether the coupon is scoped to a subset of the catalog.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        !self.category_ids.is_empty() || !self.product_ids.is_empty()
    }
}

/// Why a coupon failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponRejection {
    /// No coupon with that code.
    NotFound,
    /// Coupon is disabled.
    Inactive,
    /// Validity window has not started.
    NotYetActive,
    /// Validity window has passed.
    Expired,
    /// Total usage cap reached.
    LimitReached,
    /// Per-customer cap reached.
    UserLimitReached,
    /// Order subtotal below the coupon minimum.
    MinimumNotMet,
}

impl std::fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::NotFound => "not-found",
            Self::Inactive => "inactive",
            Self::NotYetActive => "not-yet-active",
            Self::Expired => "expired",
            Self::LimitReached => "limit-reached",
            Self::UserLimitReached => "user-limit-reached",
            Self::MinimumNotMet => "minimum-not-met",
        };
        write!(f, "{}", reason)
    }
}

/// Outcome of coupon validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponCheck {
    /// Whether the coupon may be applied.
    pub valid:  bool,
    /// First failing check, when invalid.
    pub reason: Option<CouponRejection>,
}

impl CouponCheck {
    /// A passing check.
    #[must_use]
    pub fn ok() -> Self {
        Self { valid: true, reason: None }
    }

    /// A failing check.
    #[must_use]
    pub fn rejected(reason: CouponRejection) -> Self {
        Self { valid: false, reason: Some(reason) }
    }
}

/// Discount amounts a coupon contributes to an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CouponDiscount {
    /// Amount off the order subtotal.
    pub order_discount:    u64,
    /// Amount off the shipping fee, netted by the orchestrator.
    pub shipping_discount: u64,
}

/// Append-only redemption record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponUsage {
    /// Redeemed code.
    pub code:            CouponCode,
    /// Redeeming customer.
    pub customer:        CustomerId,
    /// Order the redemption applied to.
    pub order_id:        String,
    /// Discount granted, in minor units.
    pub discount_amount: u64,
    /// When the redemption was recorded.
    pub redeemed_at:     DateTime<Utc>,
}
