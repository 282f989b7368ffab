//! # Inventory Types
//!
//! Stock records, the append-only change log, and reservation holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::catalog::{CustomerId, ProductId, VariantId};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Key addressing one inventory row: a product, or one of its variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    /// Product ID.
    pub product_id: ProductId,
    /// Variant ID, when stock is tracked per variant.
    pub variant_id: Option<VariantId>,
}

impl StockKey {
    /// Key for product-level stock.
    #[must_use]
    pub fn product(product_id: ProductId) -> Self {
        Self { product_id, variant_id: None }
    }

    /// Key for variant-level stock.
    #[must_use]
    pub fn variant(product_id: ProductId, variant_id: VariantId) -> Self {
        Self { product_id, variant_id: Some(variant_id) }
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.variant_id {
            Some(v) => write!(f, "{}/{}", self.product_id, v),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// Inventory row for a product or variant.
///
/// Invariant: `reserved_quantity <= stock_quantity` after any successful
/// operation, and `reserved_quantity` never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Inventory key.
    pub key:               StockKey,
    /// Physical count.
    pub stock_quantity:    u32,
    /// Soft-held for in-flight carts and orders.
    pub reserved_quantity: u32,
    /// Low-stock marker.
    pub threshold:         u32,
    /// Last update timestamp.
    pub updated_at:        DateTime<Utc>,
}

impl InventoryRecord {
    /// Creates an empty inventory row.
    #[must_use]
    pub fn new(key: StockKey) -> Self {
        Self {
            key,
            stock_quantity: 0,
            reserved_quantity: 0,
            threshold: 10,
            updated_at: Utc::now(),
        }
    }

    /// Quantity still sellable, clamped at zero for presentation.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.stock_quantity.saturating_sub(self.reserved_quantity)
    }

    /// Whether stock is at or below the low-stock threshold.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.available() > 0 && self.available() <= self.threshold
    }

    /// Updates the timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// CHANGE LOG
// ============================================================================

/// Kind of inventory mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryChangeType {
    /// Stock received from a supplier.
    Restock,
    /// Stock sold to a customer.
    Sale,
    /// Stock returned by a customer or released by cancellation.
    Return,
    /// Manual absolute correction.
    Manual,
    /// Other signed adjustment.
    Adjustment,
}

/// Append-only audit row. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLogEntry {
    /// Inventory key the change applies to.
    pub key:              StockKey,
    /// Kind of change.
    pub change_type:      InventoryChangeType,
    /// Signed stock delta.
    pub quantity_changed: i64,
    /// Free-form note.
    pub note:             String,
    /// When the change was recorded.
    pub timestamp:        DateTime<Utc>,
}

impl InventoryLogEntry {
    /// Creates a log entry stamped now.
    #[must_use]
    pub fn new(
        key: StockKey, change_type: InventoryChangeType, quantity_changed: i64,
        note: impl Into<String>,
    ) -> Self {
        Self {
            key,
            change_type,
            quantity_changed,
            note: note.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// RESERVATION HOLDS
// ============================================================================

/// Hold identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldId(pub String);

impl HoldId {
    /// Generates a new unique hold ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("hold-{}", uuid::Uuid::new_v4()))
    }
}

impl std::fmt::Display for HoldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Soft hold on reserved stock, released on sale-commit or expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockHold {
    /// Hold ID.
    pub id:         HoldId,
    /// Inventory key the hold pins.
    pub key:        StockKey,
    /// Held quantity.
    pub quantity:   u32,
    /// Customer the hold belongs to.
    pub customer:   CustomerId,
    /// When the expiry sweep may release the hold.
    pub expires_at: DateTime<Utc>,
    /// When the hold was taken.
    pub created_at: DateTime<Utc>,
}

impl StockHold {
    /// Whether the hold has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
