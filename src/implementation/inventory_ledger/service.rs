//! Inventory ledger operations.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::errors::{CommerceError, CommerceResult};
use crate::store::StoreTx;
use crate::types::catalog::CustomerId;
use crate::types::inventory::{
    HoldId, InventoryChangeType, InventoryLogEntry, InventoryRecord, StockHold, StockKey,
};
use crate::types::CommerceConfig;

/// Stock and reservation bookkeeping.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    reservation_ttl: Duration,
}

impl InventoryLedger {
    /// Creates a ledger with the store's reservation policy.
    #[must_use]
    pub fn new(config: &CommerceConfig) -> Self {
        Self { reservation_ttl: config.reservation_ttl }
    }

    // ========================================================================
    // RESERVATIONS
    // ========================================================================

    /// Soft-holds `quantity` units for `customer`.
    ///
    /// Increments `reserved_quantity` iff `stock - reserved >= quantity`,
    /// and records a [`StockHold`] the expiry sweep can release later.
    pub fn reserve(
        &self, tx: &mut StoreTx<'_>, key: &StockKey, quantity: u32, customer: &CustomerId,
        now: DateTime<Utc>,
    ) -> CommerceResult<StockHold> {
        if quantity == 0 {
            return Err(CommerceError::Validation("reserve quantity must be positive".into()));
        }

        let record = tx.inventory_mut(key)?;
        if record.available() < quantity {
            return Err(insufficient(record, quantity));
        }

        record.reserved_quantity += quantity;
        record.touch();

        let ttl = chrono::Duration::from_std(self.reservation_ttl)
            .map_err(|e| CommerceError::Internal(format!("reservation ttl out of range: {e}")))?;
        let hold = StockHold {
            id:         HoldId::generate(),
            key:        key.clone(),
            quantity,
            customer:   customer.clone(),
            expires_at: now + ttl,
            created_at: now,
        };
        tx.put_hold(hold.clone())?;
        Ok(hold)
    }

    /// Drops `quantity` units of reservation without selling them.
    ///
    /// Writes no log row: no physical stock changed. Clamps at zero —
    /// an underflow here means a reservation was double-released and is
    /// worth a warning, not a failed sweep.
    pub fn release_reservation(
        &self, tx: &mut StoreTx<'_>, key: &StockKey, quantity: u32,
    ) -> CommerceResult<()> {
        let record = tx.inventory_mut(key)?;
        if record.reserved_quantity < quantity {
            tracing::warn!(
                key = %key,
                reserved = record.reserved_quantity,
                release = quantity,
                "reservation release underflow, clamping to zero"
            );
        }
        record.reserved_quantity = record.reserved_quantity.saturating_sub(quantity);
        record.touch();
        Ok(())
    }

    /// Releases the reservation behind one hold and deletes the hold.
    pub fn release_hold(&self, tx: &mut StoreTx<'_>, hold_id: &HoldId) -> CommerceResult<u32> {
        let hold = tx.hold(hold_id)?.clone();
        self.release_reservation(tx, &hold.key, hold.quantity)?;
        tx.remove_hold(hold_id)?;
        Ok(hold.quantity)
    }

    // ========================================================================
    // STOCK MOVEMENTS
    // ========================================================================

    /// Consumes stock for a sale: decrements stock and reserved by
    /// `quantity` (a sale consumes its reservation), retires the holds
    /// backing the consumed reservation oldest-first, and writes a SALE row.
    pub fn commit_sale(
        &self, tx: &mut StoreTx<'_>, key: &StockKey, quantity: u32, note: impl Into<String>,
    ) -> CommerceResult<()> {
        let record = tx.inventory_mut(key)?;
        if record.stock_quantity < quantity {
            return Err(insufficient(record, quantity));
        }

        // A wholly unreserved sale is the normal direct-checkout path; a
        // partial reservation means a hold was double-released somewhere.
        if record.reserved_quantity > 0 && record.reserved_quantity < quantity {
            tracing::warn!(
                key = %key,
                reserved = record.reserved_quantity,
                sold = quantity,
                "sale consumes more than the reserved quantity, clamping to zero"
            );
        }
        record.stock_quantity -= quantity;
        record.reserved_quantity = record.reserved_quantity.saturating_sub(quantity);
        record.touch();

        self.consume_holds(tx, key, quantity)?;

        tx.push_inventory_log(InventoryLogEntry::new(
            key.clone(),
            InventoryChangeType::Sale,
            -i64::from(quantity),
            note,
        ))?;
        self.refresh_mirror(tx, key)
    }

    /// Returns stock after a cancellation or return; writes a RETURN row.
    pub fn restore(
        &self, tx: &mut StoreTx<'_>, key: &StockKey, quantity: u32, note: impl Into<String>,
    ) -> CommerceResult<()> {
        let record = tx.inventory_mut(key)?;
        record.stock_quantity = record.stock_quantity.saturating_add(quantity);
        record.touch();

        tx.push_inventory_log(InventoryLogEntry::new(
            key.clone(),
            InventoryChangeType::Return,
            i64::from(quantity),
            note,
        ))?;
        self.refresh_mirror(tx, key)
    }

    /// Receives stock from a supplier; creates the row lazily on the
    /// first stock event and writes a RESTOCK row.
    pub fn restock(
        &self, tx: &mut StoreTx<'_>, key: &StockKey, quantity: u32, note: impl Into<String>,
    ) -> CommerceResult<()> {
        let record = tx.inventory_entry(key)?;
        record.stock_quantity = record.stock_quantity.saturating_add(quantity);
        record.touch();

        tx.push_inventory_log(InventoryLogEntry::new(
            key.clone(),
            InventoryChangeType::Restock,
            i64::from(quantity),
            note,
        ))?;
        self.refresh_mirror(tx, key)
    }

    /// Sets the physical count to an absolute value; writes a MANUAL row
    /// with the signed delta.
    ///
    /// A count below the reserved quantity clamps the reservation: the
    /// invariant `reserved <= stock` holds after every successful op.
    pub fn adjust(
        &self, tx: &mut StoreTx<'_>, key: &StockKey, new_stock: u32, note: impl Into<String>,
    ) -> CommerceResult<()> {
        let record = tx.inventory_entry(key)?;
        let delta = i64::from(new_stock) - i64::from(record.stock_quantity);

        if record.reserved_quantity > new_stock {
            tracing::warn!(
                key = %key,
                reserved = record.reserved_quantity,
                new_stock,
                "manual count below reserved quantity, clamping reservation"
            );
            record.reserved_quantity = new_stock;
        }
        record.stock_quantity = new_stock;
        record.touch();

        tx.push_inventory_log(InventoryLogEntry::new(
            key.clone(),
            InventoryChangeType::Manual,
            delta,
            note,
        ))?;
        self.refresh_mirror(tx, key)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Current counts for one inventory key.
    pub fn record(&self, tx: &StoreTx<'_>, key: &StockKey) -> CommerceResult<InventoryRecord> {
        tx.inventory(key).cloned()
    }

    /// Change-log rows for one inventory key, most recent first.
    pub fn history(
        &self, tx: &StoreTx<'_>, key: &StockKey, limit: Option<usize>,
    ) -> Vec<InventoryLogEntry> {
        let mut rows: Vec<_> =
            tx.inventory_log().iter().filter(|e| &e.key == key).cloned().collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        rows
    }

    /// Rows at or below their low-stock threshold.
    pub fn low_stock(&self, tx: &StoreTx<'_>) -> Vec<InventoryRecord> {
        tx.inventory_records().filter(|r| r.is_low_stock()).cloned().collect()
    }

    /// Retires holds on `key` totaling up to `quantity`, oldest first,
    /// keeping the hold table in step with `reserved_quantity`. A hold
    /// larger than the remainder is shrunk rather than deleted.
    fn consume_holds(
        &self, tx: &mut StoreTx<'_>, key: &StockKey, quantity: u32,
    ) -> CommerceResult<()> {
        let mut holds: Vec<StockHold> = tx.holds().filter(|h| &h.key == key).cloned().collect();
        holds.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut remaining = quantity;
        for mut hold in holds {
            if remaining == 0 {
                break;
            }
            if hold.quantity <= remaining {
                remaining -= hold.quantity;
                tx.remove_hold(&hold.id)?;
            } else {
                hold.quantity -= remaining;
                remaining = 0;
                tx.put_hold(hold)?;
            }
        }
        Ok(())
    }

    /// Pushes the inventory count into the product/variant read-cache.
    ///
    /// Inventory is the single source of truth; the catalog fields are
    /// refreshed on every write so they cannot drift. A stock event may
    /// arrive before the catalog row does, so a missing row is not an
    /// error.
    fn refresh_mirror(&self, tx: &mut StoreTx<'_>, key: &StockKey) -> CommerceResult<()> {
        let stock = tx.inventory(key)?.stock_quantity;
        let result = match &key.variant_id {
            Some(variant_id) => {
                let variant_id = variant_id.clone();
                tx.variant_mut(&variant_id).map(|v| v.stock_quantity = stock)
            },
            None => {
                let product_id = key.product_id.clone();
                tx.product_mut(&product_id).map(|p| p.stock_quantity = stock)
            },
        };
        match result {
            Ok(()) | Err(CommerceError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn insufficient(record: &InventoryRecord, requested: u32) -> CommerceError {
    CommerceError::InsufficientStock {
        product_id: record.key.product_id.to_string(),
        variant_id: record.key.variant_id.as_ref().map(ToString::to_string),
        available:  record.available(),
        requested,
    }
}
