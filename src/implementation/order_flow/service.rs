//! Order placement and lifecycle.

use chrono::{DateTime, Utc};

use crate::errors::{CommerceError, CommerceResult};
use crate::implementation::coupon_engine::{CouponEngine, PricedLine};
use crate::implementation::deal_resolver::DealResolver;
use crate::implementation::inventory_ledger::InventoryLedger;
use crate::store::{CommerceStore, StoreTx};
use crate::types::catalog::Currency;
use crate::types::inventory::StockKey;
use crate::types::orders::{
    Actor, CreateOrderRequest, Order, OrderId, OrderItem, OrderStatus, OrderTotals, PaymentStatus,
    TimelineEntry,
};
use crate::types::promotions::{CouponCode, CouponDiscount};
use crate::types::CommerceConfig;

/// Places orders and drives their status machine.
///
/// All collaborators are injected; the service holds no global state
/// beyond the shared store handle.
#[derive(Debug, Clone)]
pub struct OrderService {
    store:   CommerceStore,
    config:  CommerceConfig,
    ledger:  InventoryLedger,
    deals:   DealResolver,
    coupons: CouponEngine,
}

impl OrderService {
    /// Creates an order service over a store.
    #[must_use]
    pub fn new(store: CommerceStore, config: CommerceConfig) -> Self {
        let ledger = InventoryLedger::new(&config);
        Self {
            store,
            config,
            ledger,
            deals: DealResolver::new(),
            coupons: CouponEngine::new(),
        }
    }

    // ========================================================================
    // PLACEMENT
    // ========================================================================

    /// Places an order, all-or-nothing.
    ///
    /// Validates every line, prices it through the deal resolver, applies
    /// a coupon when supplied, persists the order with its items,
    /// decrements inventory with a SALE log per line, clears matching
    /// cart rows, and appends the PENDING timeline entry — inside one
    /// transaction. Any failure rolls the whole placement back.
    pub fn create_order(&self, request: &CreateOrderRequest) -> CommerceResult<Order> {
        if request.items.is_empty() {
            return Err(CommerceError::EmptyOrder);
        }
        for line in &request.items {
            if line.quantity == 0 {
                return Err(CommerceError::Validation(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }
        }

        let now = Utc::now();
        let order = self.store.transaction(|tx| self.place(tx, request, now))?;
        tracing::info!(
            order = %order.order_number,
            customer = %order.customer,
            total = order.totals.total,
            "order placed"
        );
        Ok(order)
    }

    fn place(
        &self, tx: &mut StoreTx<'_>, request: &CreateOrderRequest, now: DateTime<Utc>,
    ) -> CommerceResult<Order> {
        let mut items: Vec<OrderItem> = Vec::with_capacity(request.items.len());
        let mut priced_lines: Vec<PricedLine> = Vec::with_capacity(request.items.len());
        let mut seen_currency: Option<Currency> = None;
        let mut subtotal: u64 = 0;

        for line in &request.items {
            let product = tx.product(&line.product_id)?.clone();
            if !product.is_active {
                return Err(CommerceError::Validation(format!(
                    "product {} is not purchasable",
                    product.id
                )));
            }

            let variant = match &line.variant_id {
                Some(variant_id) => {
                    let variant = tx.variant(variant_id)?.clone();
                    if variant.product_id != product.id {
                        return Err(CommerceError::Validation(format!(
                            "variant {} does not belong to product {}",
                            variant.id, product.id
                        )));
                    }
                    if !variant.is_active {
                        return Err(CommerceError::Validation(format!(
                            "variant {} is not purchasable",
                            variant.id
                        )));
                    }
                    Some(variant)
                },
                None => None,
            };

            // Mixed currencies are incoherent unless the caller pinned one.
            if request.currency.is_none() {
                match &seen_currency {
                    None => seen_currency = Some(product.currency.clone()),
                    Some(expected) if *expected != product.currency => {
                        return Err(CommerceError::CurrencyMismatch {
                            expected: expected.0.clone(),
                            got:      product.currency.0.clone(),
                        });
                    },
                    Some(_) => {},
                }
            }

            let key = stock_key(line.product_id.clone(), line.variant_id.clone());
            let record = tx.inventory(&key)?;
            if record.available() < line.quantity {
                return Err(CommerceError::InsufficientStock {
                    product_id: product.id.to_string(),
                    variant_id: line.variant_id.as_ref().map(ToString::to_string),
                    available:  record.available(),
                    requested:  line.quantity,
                });
            }

            let base = variant
                .as_ref()
                .and_then(|v| v.price_override)
                .unwrap_or_else(|| product.base_price());
            let unit_price = match self.deals.active_deal(tx, &product.id, now) {
                Some(deal) if self.deals.check_limits(tx, &deal, &request.customer) => {
                    self.deals.record_usage(tx, &deal.id, &request.customer)?;
                    deal.apply(base)
                },
                _ => base,
            };

            let total_price = unit_price.saturating_mul(u64::from(line.quantity));
            subtotal = subtotal.saturating_add(total_price);
            priced_lines.push(PricedLine {
                product_id: product.id.clone(),
                line_total: total_price,
            });
            items.push(OrderItem {
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                quantity: line.quantity,
                unit_price,
                total_price,
            });
        }

        let tax = subtotal.saturating_mul(self.config.tax_rate_bps) / 10_000;
        let shipping_base = if subtotal >= self.config.free_shipping_threshold {
            0
        } else {
            self.config.flat_shipping_fee
        };

        let coupon_discount = match &request.coupon_code {
            Some(code) => {
                let code = CouponCode::new(code.clone());
                self.coupons.compute_discount(
                    tx,
                    &code,
                    Some(&request.customer),
                    subtotal,
                    &priced_lines,
                    now,
                )?
            },
            None => CouponDiscount::default(),
        };

        let shipping_fee = shipping_base.saturating_sub(coupon_discount.shipping_discount);
        let mut discount = coupon_discount.order_discount;
        let gross = subtotal.saturating_add(tax).saturating_add(shipping_fee);
        if discount > gross {
            tracing::error!(
                discount,
                gross,
                "order discount exceeds gross total, clamping"
            );
            discount = gross;
        }
        let totals = OrderTotals {
            subtotal,
            tax,
            shipping_fee,
            discount,
            total: gross - discount,
        };

        let currency = request
            .currency
            .clone()
            .or(seen_currency)
            .unwrap_or_else(|| self.config.default_currency.clone());
        let order_number = format!("ORD-{:06}", tx.next_order_number()?);

        let mut order = Order {
            id: OrderId::generate(),
            order_number: order_number.clone(),
            customer: request.customer.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address: request.shipping_address.clone(),
            billing_address: request
                .billing_address
                .clone()
                .unwrap_or_else(|| request.shipping_address.clone()),
            totals,
            currency,
            items,
            coupon_code: request.coupon_code.clone(),
            timeline: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        order.push_timeline(OrderStatus::Pending, "Order placed");

        // Folded reserve/commit: stock and reserved both drop by the sold
        // quantity, one SALE log row per line.
        for item in &order.items {
            let key = stock_key(item.product_id.clone(), item.variant_id.clone());
            self.ledger.commit_sale(tx, &key, item.quantity, format!("order {order_number}"))?;
        }

        if let Some(code) = &request.coupon_code {
            // Record what the coupon actually took off, not its face value:
            // the shipping discount nets against a fee that may already be 0.
            let granted = discount + (shipping_base - shipping_fee);
            self.coupons.record_usage(
                tx,
                &order.id,
                &request.customer,
                &CouponCode::new(code.clone()),
                granted,
            )?;
        }

        let ordered: Vec<_> = order
            .items
            .iter()
            .map(|i| (i.product_id.clone(), i.variant_id.clone()))
            .collect();
        tx.remove_cart_lines(&request.customer, &ordered)?;

        tx.put_order(order.clone())?;
        Ok(order)
    }

    // ========================================================================
    // STATUS MACHINE
    // ========================================================================

    /// Moves an order to `new_status`.
    ///
    /// Terminal states reject all transitions; CANCELLED and RETURNED
    /// restore inventory within the same transaction as the status write.
    pub fn update_status(
        &self, order_id: &OrderId, new_status: OrderStatus, note: Option<String>,
    ) -> CommerceResult<Order> {
        self.store.transaction(|tx| self.transition(tx, order_id, new_status, note))
    }

    /// Cancels an order on behalf of `actor`.
    ///
    /// Only the placing customer or staff may cancel.
    pub fn cancel(&self, order_id: &OrderId, actor: &Actor) -> CommerceResult<Order> {
        self.store.transaction(|tx| {
            let order = tx.order(order_id)?;
            if let Actor::Customer(customer) = actor {
                if customer != &order.customer {
                    return Err(CommerceError::Forbidden(format!(
                        "customer {customer} does not own order {order_id}"
                    )));
                }
            }
            self.transition(tx, order_id, OrderStatus::Cancelled, None)
        })
    }

    fn transition(
        &self, tx: &mut StoreTx<'_>, order_id: &OrderId, new_status: OrderStatus,
        note: Option<String>,
    ) -> CommerceResult<Order> {
        let order = tx.order(order_id)?.clone();
        if !order.status.can_transition_to(new_status) {
            return Err(CommerceError::Conflict(format!(
                "order {} cannot move from {} to {}",
                order.order_number,
                order.status.display_name(),
                new_status.display_name()
            )));
        }

        if new_status.restores_inventory() {
            for item in &order.items {
                let key = stock_key(item.product_id.clone(), item.variant_id.clone());
                self.ledger.restore(
                    tx,
                    &key,
                    item.quantity,
                    format!(
                        "order {} {}",
                        order.order_number,
                        new_status.display_name().to_lowercase()
                    ),
                )?;
            }
        }

        let stored = tx.order_mut(order_id)?;
        stored.status = new_status;
        stored.push_timeline(
            new_status,
            note.unwrap_or_else(|| format!("Status changed to {}", new_status.display_name())),
        );
        Ok(stored.clone())
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Fetches an order.
    pub fn get_order(&self, order_id: &OrderId) -> CommerceResult<Order> {
        self.store.transaction(|tx| tx.order(order_id).cloned())
    }

    /// The order's append-only status timeline.
    pub fn get_timeline(&self, order_id: &OrderId) -> CommerceResult<Vec<TimelineEntry>> {
        self.store.transaction(|tx| Ok(tx.order(order_id)?.timeline.clone()))
    }

    // ========================================================================
    // PAYMENT EVENT SINK
    // ========================================================================

    /// Payment captured: marks the order paid and confirms it when still
    /// pending.
    pub fn handle_payment_succeeded(&self, order_id: &OrderId) -> CommerceResult<Order> {
        self.store.transaction(|tx| {
            tx.order_mut(order_id)?.payment_status = PaymentStatus::Paid;
            let order = tx.order(order_id)?.clone();
            if order.status == OrderStatus::Pending {
                return self.transition(
                    tx,
                    order_id,
                    OrderStatus::Confirmed,
                    Some("Payment received".to_string()),
                );
            }
            Ok(order)
        })
    }

    /// Payment failed: marks the order unpaid and notes it on the
    /// timeline without moving the status machine.
    pub fn handle_payment_failed(&self, order_id: &OrderId) -> CommerceResult<Order> {
        self.store.transaction(|tx| {
            let order = tx.order_mut(order_id)?;
            order.payment_status = PaymentStatus::Failed;
            let status = order.status;
            order.push_timeline(status, "Payment failed");
            Ok(order.clone())
        })
    }

    /// Payment refunded: marks the order refunded and moves the status
    /// machine when it still permits the REFUNDED transition.
    pub fn handle_payment_refunded(&self, order_id: &OrderId) -> CommerceResult<Order> {
        self.store.transaction(|tx| {
            tx.order_mut(order_id)?.payment_status = PaymentStatus::Refunded;
            let order = tx.order(order_id)?.clone();
            if order.status.can_transition_to(OrderStatus::Refunded) {
                return self.transition(
                    tx,
                    order_id,
                    OrderStatus::Refunded,
                    Some("Payment refunded".to_string()),
                );
            }
            Ok(order)
        })
    }
}

fn stock_key(
    product_id: crate::types::catalog::ProductId,
    variant_id: Option<crate::types::catalog::VariantId>,
) -> StockKey {
    match variant_id {
        Some(variant_id) => StockKey::variant(product_id, variant_id),
        None => StockKey::product(product_id),
    }
}
