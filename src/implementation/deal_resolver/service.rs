//! Deal resolution and lifecycle.

use chrono::{DateTime, Utc};

use crate::errors::{CommerceError, CommerceResult};
use crate::store::StoreTx;
use crate::types::catalog::{CustomerId, Product, ProductId, ProductVariant};
use crate::types::promotions::{
    DealId, DealLimits, DealTemplate, DealType, ProductDeal, TemplateId,
};

/// Resolves which deal applies to a product and at what price.
#[derive(Debug, Clone, Default)]
pub struct DealResolver;

impl DealResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    // ========================================================================
    // PRICE RESOLUTION
    // ========================================================================

    /// The deal applying to `product_id` at `at`, if any.
    ///
    /// Non-overlap is enforced at creation, so at most one deal should
    /// match; if several do, the larger discount wins, tie-broken by most
    /// recent creation.
    pub fn active_deal(
        &self, tx: &StoreTx<'_>, product_id: &ProductId, at: DateTime<Utc>,
    ) -> Option<ProductDeal> {
        tx.deals_for_product(product_id)
            .into_iter()
            .filter(|d| d.is_active_at(at))
            .max_by(|a, b| {
                a.discount_percent
                    .cmp(&b.discount_percent)
                    .then(a.created_at.cmp(&b.created_at))
            })
            .cloned()
    }

    /// Unit price for the product (or variant) at `at`.
    ///
    /// Base price is the variant override when present, otherwise the
    /// product's promotional price, otherwise its list price; an active
    /// deal then takes its percentage off the base.
    pub fn effective_price(
        &self, tx: &StoreTx<'_>, product: &Product, variant: Option<&ProductVariant>,
        at: DateTime<Utc>,
    ) -> u64 {
        let base = variant
            .and_then(|v| v.price_override)
            .unwrap_or_else(|| product.base_price());

        match self.active_deal(tx, &product.id, at) {
            Some(deal) => deal.apply(base),
            None => base,
        }
    }

    // ========================================================================
    // DEAL LIFECYCLE
    // ========================================================================

    /// Creates a deal for a product.
    ///
    /// Rejects a window that overlaps (inclusive bounds) an existing deal
    /// of the same type for the same product.
    pub fn create_deal(
        &self, tx: &mut StoreTx<'_>, product_id: &ProductId, deal_type: DealType,
        discount_percent: u64, start_time: DateTime<Utc>, end_time: DateTime<Utc>,
        limits: DealLimits,
    ) -> CommerceResult<ProductDeal> {
        validate_percent(discount_percent)?;
        if start_time >= end_time {
            return Err(CommerceError::Validation(
                "deal start must precede its end".to_string(),
            ));
        }
        tx.product(product_id)?;
        self.validate_no_overlap(tx, product_id, deal_type, start_time, end_time)?;

        let deal = ProductDeal {
            id: DealId::generate(),
            product_id: product_id.clone(),
            deal_type,
            discount_percent,
            start_time,
            end_time,
            limits,
            current_usage: 0,
            created_at: Utc::now(),
        };
        tx.put_deal(deal.clone())?;
        Ok(deal)
    }

    /// Fails with `Conflict` if a same-type deal for the product overlaps
    /// the `[start, end]` window, boundaries included.
    pub fn validate_no_overlap(
        &self, tx: &StoreTx<'_>, product_id: &ProductId, deal_type: DealType,
        start: DateTime<Utc>, end: DateTime<Utc>,
    ) -> CommerceResult<()> {
        let conflicting = tx
            .deals_for_product(product_id)
            .into_iter()
            .find(|d| d.deal_type == deal_type && d.overlaps(start, end));

        if let Some(existing) = conflicting {
            return Err(CommerceError::Conflict(format!(
                "{} deal {} already covers an overlapping window for product {}",
                deal_type, existing.id, product_id
            )));
        }
        Ok(())
    }

    // ========================================================================
    // USAGE CAPS
    // ========================================================================

    /// Whether `customer` may still benefit from a capped deal.
    pub fn check_limits(
        &self, tx: &StoreTx<'_>, deal: &ProductDeal, customer: &CustomerId,
    ) -> bool {
        if let Some(max_total) = deal.limits.max_total_usage {
            if deal.current_usage >= max_total {
                return false;
            }
        }
        if let Some(max_user) = deal.limits.max_user_usage {
            if tx.deal_user_usage(&deal.id, customer) >= max_user {
                return false;
            }
        }
        true
    }

    /// Counts one redemption against the deal's caps. Runs inside the
    /// same transaction that creates the benefiting order.
    pub fn record_usage(
        &self, tx: &mut StoreTx<'_>, deal_id: &DealId, customer: &CustomerId,
    ) -> CommerceResult<()> {
        tx.bump_deal_usage(deal_id, customer)
    }

    // ========================================================================
    // TEMPLATES
    // ========================================================================

    /// Creates a reusable deal template.
    pub fn create_template(
        &self, tx: &mut StoreTx<'_>, name: impl Into<String>, deal_type: DealType,
        discount_percent: u64, duration: std::time::Duration, limits: DealLimits,
    ) -> CommerceResult<DealTemplate> {
        validate_percent(discount_percent)?;
        if duration.is_zero() {
            return Err(CommerceError::Validation(
                "template duration must be positive".to_string(),
            ));
        }

        let template = DealTemplate {
            id: TemplateId::generate(),
            name: name.into(),
            deal_type,
            discount_percent,
            duration,
            limits,
        };
        tx.put_template(template.clone())?;
        Ok(template)
    }

    /// Instantiates a template into a concrete deal starting at `start`.
    pub fn instantiate_template(
        &self, tx: &mut StoreTx<'_>, template_id: &TemplateId, product_id: &ProductId,
        start: DateTime<Utc>,
    ) -> CommerceResult<ProductDeal> {
        let template = tx.template(template_id)?.clone();
        let duration = chrono::Duration::from_std(template.duration)
            .map_err(|e| CommerceError::Internal(format!("template duration out of range: {e}")))?;
        self.create_deal(
            tx,
            product_id,
            template.deal_type,
            template.discount_percent,
            start,
            start + duration,
            template.limits,
        )
    }
}

fn validate_percent(percent: u64) -> CommerceResult<()> {
    if percent == 0 || percent > 100 {
        return Err(CommerceError::Validation(format!(
            "discount percent must be within 1-100, got {percent}"
        )));
    }
    Ok(())
}
