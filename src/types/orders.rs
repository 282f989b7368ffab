//! # Order Types
//!
//! Orders, line items, the status machine, and the placement request DTO.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::catalog::{Currency, CustomerId, ProductId, VariantId};

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Creates a new order ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new unique order ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("ord-{}", uuid::Uuid::new_v4()))
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// STATUS MACHINE
// ============================================================================

/// Order status.
///
/// Forward chain `Pending -> Confirmed -> Processing -> Shipped ->
/// Delivered`, with `Cancelled` and `Refunded` reachable from any
/// non-terminal state and `Returned` reachable only from `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Placed, awaiting confirmation.
    #[default]
    Pending,
    /// Confirmed by payment or staff.
    Confirmed,
    /// Being picked and packed.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Delivered to the customer.
    Delivered,
    /// Cancelled before delivery.
    Cancelled,
    /// Refunded.
    Refunded,
    /// Returned after delivery.
    Returned,
}

impl OrderStatus {
    /// Whether no further transitions are permitted from this state.
    ///
    /// `Delivered` is special: immutable except for the `Returned`
    /// transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded | Self::Returned)
    }

    /// Whether the machine permits moving to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() || *self == next {
            return false;
        }
        match (*self, next) {
            (Self::Delivered, Self::Returned) => true,
            (Self::Delivered, _) => false,
            (_, Self::Cancelled | Self::Refunded) => true,
            (Self::Pending, Self::Confirmed)
            | (Self::Confirmed, Self::Processing)
            | (Self::Processing, Self::Shipped)
            | (Self::Shipped, Self::Delivered) => true,
            _ => false,
        }
    }

    /// Whether moving into this state restores inventory.
    #[must_use]
    pub fn restores_inventory(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
            Self::Returned => "Returned",
        }
    }
}

/// Payment status, driven by the external payment event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Awaiting payment.
    #[default]
    Pending,
    /// Payment captured.
    Paid,
    /// Payment failed.
    Failed,
    /// Payment refunded.
    Refunded,
}

// ============================================================================
// ORDER
// ============================================================================

/// Shipping or billing address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    /// Recipient name.
    pub name:        String,
    /// Street line.
    pub street:      String,
    /// City.
    pub city:        String,
    /// Postal code.
    pub postal_code: String,
    /// Country code.
    pub country:     String,
}

/// Order line item. `unit_price` is the price at order time and never
/// changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Ordered product.
    pub product_id:  ProductId,
    /// Ordered variant, if any.
    pub variant_id:  Option<VariantId>,
    /// Quantity ordered.
    pub quantity:    u32,
    /// Unit price snapshot in minor units.
    pub unit_price:  u64,
    /// `unit_price * quantity`.
    pub total_price: u64,
}

/// Append-only status-timeline entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Status entered.
    pub status:    OrderStatus,
    /// Free-form note.
    pub note:      String,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

/// Order money breakdown. `total = subtotal + tax + shipping_fee -
/// discount` always holds and never goes negative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of line totals.
    pub subtotal:     u64,
    /// Tax amount.
    pub tax:          u64,
    /// Shipping fee after any shipping discount.
    pub shipping_fee: u64,
    /// Order-level discount.
    pub discount:     u64,
    /// Grand total.
    pub total:        u64,
}

/// Placed order. Created atomically with its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id:               OrderId,
    /// Externally unique order number.
    pub order_number:     String,
    /// Placing customer.
    pub customer:         CustomerId,
    /// Status machine state.
    pub status:           OrderStatus,
    /// Payment state.
    pub payment_status:   PaymentStatus,
    /// Shipping address.
    pub shipping_address: Address,
    /// Billing address.
    pub billing_address:  Address,
    /// Money breakdown.
    pub totals:           OrderTotals,
    /// Order currency.
    pub currency:         Currency,
    /// Line items.
    pub items:            Vec<OrderItem>,
    /// Coupon code applied, if any.
    pub coupon_code:      Option<String>,
    /// Append-only status timeline.
    pub timeline:         Vec<TimelineEntry>,
    /// Creation timestamp.
    pub created_at:       DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at:       DateTime<Utc>,
}

impl Order {
    /// Appends a timeline entry and updates the timestamp.
    pub fn push_timeline(&mut self, status: OrderStatus, note: impl Into<String>) {
        let now = Utc::now();
        self.timeline.push(TimelineEntry { status, note: note.into(), timestamp: now });
        self.updated_at = now;
    }
}

// ============================================================================
// REQUEST DTOS
// ============================================================================

/// One requested order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    /// Product to order.
    pub product_id: ProductId,
    /// Variant to order, if any.
    pub variant_id: Option<VariantId>,
    /// Quantity, must be positive.
    pub quantity:   u32,
}

/// Order placement request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Placing customer.
    pub customer:         CustomerId,
    /// Requested lines.
    pub items:            Vec<OrderLineRequest>,
    /// Explicit order currency; required when lines mix currencies.
    pub currency:         Option<Currency>,
    /// Coupon code to apply, if any.
    pub coupon_code:      Option<String>,
    /// Shipping address.
    pub shipping_address: Address,
    /// Billing address; defaults to the shipping address.
    pub billing_address:  Option<Address>,
}

/// Who is asking for an order mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// An end customer.
    Customer(CustomerId),
    /// Store staff.
    Staff,
}

/// Cart row owned by the external cart layer; the orchestrator deletes
/// matching rows after a successful placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Owning customer.
    pub customer:   CustomerId,
    /// Product in the cart.
    pub product_id: ProductId,
    /// Variant in the cart, if any.
    pub variant_id: Option<VariantId>,
    /// Quantity in the cart.
    pub quantity:   u32,
}
