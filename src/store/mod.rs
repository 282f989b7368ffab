//! # Commerce Store
//!
//! In-process relational-style store with an explicit unit of work.
//!
//! [`CommerceStore::transaction`] locks the store, hands the closure a
//! [`StoreTx`] over a working copy of the state, and publishes the copy
//! only when the closure returns `Ok` — all writes commit together or not
//! at all. Commits are serialized by the lock, so any interleaving of
//! transactions is equivalent to some serial order: two concurrent
//! checkouts against the same inventory row can never both observe the
//! pre-decrement stock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::errors::{CommerceError, CommerceResult};
use crate::types::catalog::{CustomerId, Product, ProductId, ProductVariant, VariantId};
use crate::types::inventory::{HoldId, InventoryLogEntry, InventoryRecord, StockHold, StockKey};
use crate::types::orders::{CartLine, Order, OrderId};
use crate::types::promotions::{
    Coupon, CouponCode, CouponUsage, DealId, DealTemplate, ProductDeal, TemplateId,
};

/// Backing tables. Cloned wholesale per transaction; the clone is the
/// rollback mechanism.
#[derive(Debug, Clone, Default)]
struct StoreState {
    products:      HashMap<ProductId, Product>,
    variants:      HashMap<VariantId, ProductVariant>,
    inventory:     HashMap<StockKey, InventoryRecord>,
    inventory_log: Vec<InventoryLogEntry>,
    holds:         HashMap<HoldId, StockHold>,
    deals:         HashMap<DealId, ProductDeal>,
    deal_usage:    HashMap<(DealId, CustomerId), u32>,
    templates:     HashMap<TemplateId, DealTemplate>,
    coupons:       HashMap<CouponCode, Coupon>,
    coupon_usage:  Vec<CouponUsage>,
    orders:        HashMap<OrderId, Order>,
    cart_lines:    Vec<CartLine>,
    order_counter: u64,
}

/// Shared handle to the store.
#[derive(Debug, Clone)]
pub struct CommerceStore {
    state:      Arc<Mutex<StoreState>>,
    tx_timeout: Duration,
}

impl CommerceStore {
    /// Creates an empty store whose transactions abort after `tx_timeout`.
    #[must_use]
    pub fn new(tx_timeout: Duration) -> Self {
        let state = StoreState { order_counter: 1000, ..StoreState::default() };
        Self { state: Arc::new(Mutex::new(state)), tx_timeout }
    }

    /// Runs `f` inside one transaction.
    ///
    /// All writes made through the [`StoreTx`] become visible atomically
    /// when `f` returns `Ok`; any error rolls everything back.
    pub fn transaction<T>(
        &self, f: impl FnOnce(&mut StoreTx<'_>) -> CommerceResult<T>,
    ) -> CommerceResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CommerceError::Internal("store lock poisoned".to_string()))?;

        let mut working = state.clone();
        let mut tx = StoreTx {
            state:    &mut working,
            deadline: Instant::now() + self.tx_timeout,
        };

        let value = f(&mut tx)?;
        *state = working;
        Ok(value)
    }
}

/// Transaction scope passed through the call chain.
///
/// Every ledger, deal, coupon, and order mutation takes a `StoreTx`
/// parameter rather than inferring a current transaction.
#[derive(Debug)]
pub struct StoreTx<'a> {
    state:    &'a mut StoreState,
    deadline: Instant,
}

impl StoreTx<'_> {
    /// Aborts the transaction if its deadline has passed.
    pub fn check_deadline(&self) -> CommerceResult<()> {
        if Instant::now() > self.deadline {
            return Err(CommerceError::TransactionTimeout);
        }
        Ok(())
    }

    // ========================================================================
    // CATALOG
    // ========================================================================

    /// Inserts or replaces a product.
    pub fn put_product(&mut self, product: Product) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.products.insert(product.id.clone(), product);
        Ok(())
    }

    /// Fetches a product.
    pub fn product(&self, id: &ProductId) -> CommerceResult<&Product> {
        self.check_deadline()?;
        self.state
            .products
            .get(id)
            .ok_or_else(|| CommerceError::not_found("product", id.as_str()))
    }

    /// Fetches a product for mutation.
    pub fn product_mut(&mut self, id: &ProductId) -> CommerceResult<&mut Product> {
        self.check_deadline()?;
        self.state
            .products
            .get_mut(id)
            .ok_or_else(|| CommerceError::not_found("product", id.as_str()))
    }

    /// Inserts or replaces a variant.
    pub fn put_variant(&mut self, variant: ProductVariant) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.variants.insert(variant.id.clone(), variant);
        Ok(())
    }

    /// Fetches a variant.
    pub fn variant(&self, id: &VariantId) -> CommerceResult<&ProductVariant> {
        self.check_deadline()?;
        self.state
            .variants
            .get(id)
            .ok_or_else(|| CommerceError::not_found("variant", id.as_str()))
    }

    /// Fetches a variant for mutation.
    pub fn variant_mut(&mut self, id: &VariantId) -> CommerceResult<&mut ProductVariant> {
        self.check_deadline()?;
        self.state
            .variants
            .get_mut(id)
            .ok_or_else(|| CommerceError::not_found("variant", id.as_str()))
    }

    // ========================================================================
    // INVENTORY
    // ========================================================================

    /// Fetches an inventory row; `NotFound` if no stock event created it.
    pub fn inventory(&self, key: &StockKey) -> CommerceResult<&InventoryRecord> {
        self.check_deadline()?;
        self.state
            .inventory
            .get(key)
            .ok_or_else(|| CommerceError::not_found("inventory", key.to_string()))
    }

    /// Fetches an inventory row for mutation.
    pub fn inventory_mut(&mut self, key: &StockKey) -> CommerceResult<&mut InventoryRecord> {
        self.check_deadline()?;
        self.state
            .inventory
            .get_mut(key)
            .ok_or_else(|| CommerceError::not_found("inventory", key.to_string()))
    }

    /// Fetches an inventory row, creating it lazily on first stock event.
    pub fn inventory_entry(&mut self, key: &StockKey) -> CommerceResult<&mut InventoryRecord> {
        self.check_deadline()?;
        Ok(self
            .state
            .inventory
            .entry(key.clone())
            .or_insert_with(|| InventoryRecord::new(key.clone())))
    }

    /// All inventory rows.
    #[must_use]
    pub fn inventory_records(&self) -> impl Iterator<Item = &InventoryRecord> {
        self.state.inventory.values()
    }

    /// Appends to the inventory change log.
    pub fn push_inventory_log(&mut self, entry: InventoryLogEntry) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.inventory_log.push(entry);
        Ok(())
    }

    /// The append-only inventory change log.
    #[must_use]
    pub fn inventory_log(&self) -> &[InventoryLogEntry] {
        &self.state.inventory_log
    }

    /// Records a stock hold.
    pub fn put_hold(&mut self, hold: StockHold) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.holds.insert(hold.id.clone(), hold);
        Ok(())
    }

    /// Fetches a stock hold.
    pub fn hold(&self, id: &HoldId) -> CommerceResult<&StockHold> {
        self.check_deadline()?;
        self.state
            .holds
            .get(id)
            .ok_or_else(|| CommerceError::not_found("hold", id.to_string()))
    }

    /// All stock holds.
    #[must_use]
    pub fn holds(&self) -> impl Iterator<Item = &StockHold> {
        self.state.holds.values()
    }

    /// Deletes a stock hold. Deleting a missing hold is a no-op.
    pub fn remove_hold(&mut self, id: &HoldId) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.holds.remove(id);
        Ok(())
    }

    // ========================================================================
    // PROMOTIONS
    // ========================================================================

    /// Inserts a deal.
    pub fn put_deal(&mut self, deal: ProductDeal) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.deals.insert(deal.id.clone(), deal);
        Ok(())
    }

    /// Fetches a deal.
    pub fn deal(&self, id: &DealId) -> CommerceResult<&ProductDeal> {
        self.check_deadline()?;
        self.state
            .deals
            .get(id)
            .ok_or_else(|| CommerceError::not_found("deal", id.to_string()))
    }

    /// All deals for a product.
    #[must_use]
    pub fn deals_for_product(&self, product_id: &ProductId) -> Vec<&ProductDeal> {
        self.state.deals.values().filter(|d| &d.product_id == product_id).collect()
    }

    /// Redemption count for one (deal, customer) pair.
    #[must_use]
    pub fn deal_user_usage(&self, deal_id: &DealId, customer: &CustomerId) -> u32 {
        self.state
            .deal_usage
            .get(&(deal_id.clone(), customer.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Increments the aggregate and per-customer usage counters for a deal.
    pub fn bump_deal_usage(
        &mut self, deal_id: &DealId, customer: &CustomerId,
    ) -> CommerceResult<()> {
        self.check_deadline()?;
        let deal = self
            .state
            .deals
            .get_mut(deal_id)
            .ok_or_else(|| CommerceError::not_found("deal", deal_id.to_string()))?;
        deal.current_usage = deal.current_usage.saturating_add(1);

        let counter = self
            .state
            .deal_usage
            .entry((deal_id.clone(), customer.clone()))
            .or_insert(0);
        *counter = counter.saturating_add(1);
        Ok(())
    }

    /// Inserts a deal template.
    pub fn put_template(&mut self, template: DealTemplate) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Fetches a deal template.
    pub fn template(&self, id: &TemplateId) -> CommerceResult<&DealTemplate> {
        self.check_deadline()?;
        self.state
            .templates
            .get(id)
            .ok_or_else(|| CommerceError::not_found("deal template", id.0.clone()))
    }

    /// Inserts a coupon; the code must be unique.
    pub fn put_coupon(&mut self, coupon: Coupon) -> CommerceResult<()> {
        self.check_deadline()?;
        if self.state.coupons.contains_key(&coupon.code) {
            return Err(CommerceError::Conflict(format!(
                "coupon code already exists: {}",
                coupon.code
            )));
        }
        self.state.coupons.insert(coupon.code.clone(), coupon);
        Ok(())
    }

    /// Looks up a coupon by code.
    #[must_use]
    pub fn coupon(&self, code: &CouponCode) -> Option<&Coupon> {
        self.state.coupons.get(code)
    }

    /// Fetches a coupon for mutation.
    pub fn coupon_mut(&mut self, code: &CouponCode) -> CommerceResult<&mut Coupon> {
        self.check_deadline()?;
        self.state
            .coupons
            .get_mut(code)
            .ok_or_else(|| CommerceError::not_found("coupon", code.to_string()))
    }

    /// Appends a coupon redemption row.
    pub fn push_coupon_usage(&mut self, usage: CouponUsage) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.coupon_usage.push(usage);
        Ok(())
    }

    /// Append-only coupon redemption rows.
    #[must_use]
    pub fn coupon_usage(&self) -> &[CouponUsage] {
        &self.state.coupon_usage
    }

    /// Redemption count for one (coupon, customer) pair.
    #[must_use]
    pub fn coupon_user_usage(&self, code: &CouponCode, customer: &CustomerId) -> u32 {
        self.state
            .coupon_usage
            .iter()
            .filter(|u| &u.code == code && &u.customer == customer)
            .count() as u32
    }

    // ========================================================================
    // ORDERS & CART
    // ========================================================================

    /// Inserts an order.
    pub fn put_order(&mut self, order: Order) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.orders.insert(order.id.clone(), order);
        Ok(())
    }

    /// Fetches an order.
    pub fn order(&self, id: &OrderId) -> CommerceResult<&Order> {
        self.check_deadline()?;
        self.state
            .orders
            .get(id)
            .ok_or_else(|| CommerceError::not_found("order", id.to_string()))
    }

    /// Fetches an order for mutation.
    pub fn order_mut(&mut self, id: &OrderId) -> CommerceResult<&mut Order> {
        self.check_deadline()?;
        self.state
            .orders
            .get_mut(id)
            .ok_or_else(|| CommerceError::not_found("order", id.to_string()))
    }

    /// Next sequential order number.
    pub fn next_order_number(&mut self) -> CommerceResult<u64> {
        self.check_deadline()?;
        self.state.order_counter += 1;
        Ok(self.state.order_counter)
    }

    /// Adds a cart row (seeded by the external cart layer).
    pub fn put_cart_line(&mut self, line: CartLine) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.cart_lines.push(line);
        Ok(())
    }

    /// Cart rows for one customer.
    #[must_use]
    pub fn cart_lines(&self, customer: &CustomerId) -> Vec<&CartLine> {
        self.state.cart_lines.iter().filter(|l| &l.customer == customer).collect()
    }

    /// Deletes the customer's cart rows matching the ordered pairs.
    pub fn remove_cart_lines(
        &mut self, customer: &CustomerId, ordered: &[(ProductId, Option<VariantId>)],
    ) -> CommerceResult<()> {
        self.check_deadline()?;
        self.state.cart_lines.retain(|l| {
            !(&l.customer == customer
                && ordered
                    .iter()
                    .any(|(p, v)| p == &l.product_id && v == &l.variant_id))
        });
        Ok(())
    }
}
