//! Coupon validation and discount computation.

use chrono::{DateTime, Utc};

use crate::errors::{CommerceError, CommerceResult};
use crate::store::StoreTx;
use crate::types::catalog::{CustomerId, ProductId};
use crate::types::orders::OrderId;
use crate::types::promotions::{
    Coupon, CouponCheck, CouponCode, CouponDiscount, CouponRejection, CouponStatus, CouponType,
    CouponUsage,
};

/// One priced order line, as seen by the discount computation.
#[derive(Debug, Clone)]
pub struct PricedLine {
    /// Product on the line.
    pub product_id: ProductId,
    /// `unit_price * quantity` in minor units.
    pub line_total: u64,
}

/// Validates coupon codes and computes their discounts.
#[derive(Debug, Clone, Default)]
pub struct CouponEngine;

impl CouponEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Registers a coupon. The code must be unique.
    pub fn create_coupon(&self, tx: &mut StoreTx<'_>, coupon: Coupon) -> CommerceResult<()> {
        if coupon.value == 0 {
            return Err(CommerceError::Validation("coupon value must be positive".into()));
        }
        if coupon.coupon_type == CouponType::Percentage && coupon.value > 100 {
            return Err(CommerceError::Validation(format!(
                "percentage coupon value must be within 1-100, got {}",
                coupon.value
            )));
        }
        if coupon.start_date >= coupon.end_date {
            return Err(CommerceError::Validation(
                "coupon start must precede its end".to_string(),
            ));
        }
        tx.put_coupon(coupon)
    }

    /// Checks whether a code is redeemable at `at`.
    ///
    /// Checks run in order — existence, status, date window, total cap,
    /// per-customer cap — and the first failure short-circuits.
    pub fn validate(
        &self, tx: &StoreTx<'_>, code: &CouponCode, customer: Option<&CustomerId>,
        at: DateTime<Utc>,
    ) -> CouponCheck {
        let Some(coupon) = tx.coupon(code) else {
            return CouponCheck::rejected(CouponRejection::NotFound);
        };
        if coupon.status != CouponStatus::Active {
            return CouponCheck::rejected(CouponRejection::Inactive);
        }
        if at < coupon.start_date {
            return CouponCheck::rejected(CouponRejection::NotYetActive);
        }
        if at > coupon.end_date {
            return CouponCheck::rejected(CouponRejection::Expired);
        }
        if let Some(limit) = coupon.usage_limit {
            if coupon.usage_count >= limit {
                return CouponCheck::rejected(CouponRejection::LimitReached);
            }
        }
        if let Some(limit) = coupon.per_user_limit {
            if let Some(customer) = customer {
                if tx.coupon_user_usage(code, customer) >= limit {
                    return CouponCheck::rejected(CouponRejection::UserLimitReached);
                }
            }
        }
        CouponCheck::ok()
    }

    /// Computes the discount a code grants against `lines`.
    ///
    /// Re-validates first. Scoped percentage coupons discount only the
    /// eligible lines; a scoped coupon matching zero lines yields a zero
    /// discount, not an error. `FreeShipping` contributes a shipping
    /// discount for the orchestrator to net against the fee.
    pub fn compute_discount(
        &self, tx: &StoreTx<'_>, code: &CouponCode, customer: Option<&CustomerId>, subtotal: u64,
        lines: &[PricedLine], at: DateTime<Utc>,
    ) -> CommerceResult<CouponDiscount> {
        let check = self.validate(tx, code, customer, at);
        if let Some(reason) = check.reason {
            return Err(match reason {
                CouponRejection::NotFound => CommerceError::not_found("coupon", code.to_string()),
                other => {
                    CommerceError::Validation(format!("coupon {code} rejected: {other}"))
                },
            });
        }

        let coupon = tx
            .coupon(code)
            .ok_or_else(|| CommerceError::not_found("coupon", code.to_string()))?;

        if subtotal < coupon.minimum_purchase {
            return Err(CommerceError::Validation(format!(
                "coupon {code} rejected: {}",
                CouponRejection::MinimumNotMet
            )));
        }

        let discount = match coupon.coupon_type {
            CouponType::Percentage => {
                let base = if coupon.is_scoped() {
                    self.eligible_subtotal(tx, coupon, lines)
                } else {
                    subtotal
                };
                CouponDiscount {
                    order_discount:    base.saturating_mul(coupon.value) / 100,
                    shipping_discount: 0,
                }
            },
            CouponType::FixedAmount => CouponDiscount {
                order_discount:    coupon.value.min(subtotal),
                shipping_discount: 0,
            },
            CouponType::FreeShipping => CouponDiscount {
                order_discount:    0,
                shipping_discount: coupon.value,
            },
        };
        Ok(discount)
    }

    /// Records a redemption and bumps the aggregate counter. Runs inside
    /// the transaction that creates the order.
    pub fn record_usage(
        &self, tx: &mut StoreTx<'_>, order_id: &OrderId, customer: &CustomerId,
        code: &CouponCode, discount_amount: u64,
    ) -> CommerceResult<()> {
        tx.push_coupon_usage(CouponUsage {
            code: code.clone(),
            customer: customer.clone(),
            order_id: order_id.to_string(),
            discount_amount,
            redeemed_at: Utc::now(),
        })?;
        let coupon = tx.coupon_mut(code)?;
        coupon.usage_count = coupon.usage_count.saturating_add(1);
        Ok(())
    }

    /// Sum of line totals the coupon's scope covers.
    ///
    /// A line is eligible when its product is listed directly or carries
    /// a listed category.
    fn eligible_subtotal(&self, tx: &StoreTx<'_>, coupon: &Coupon, lines: &[PricedLine]) -> u64 {
        lines
            .iter()
            .filter(|line| {
                if coupon.product_ids.contains(&line.product_id) {
                    return true;
                }
                match tx.product(&line.product_id) {
                    Ok(product) => {
                        coupon.category_ids.iter().any(|c| product.in_category(c))
                    },
                    Err(_) => false,
                }
            })
            .map(|line| line.line_total)
            .sum()
    }
}
