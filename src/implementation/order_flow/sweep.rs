//! Reservation-expiry sweep.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::errors::{CommerceError, CommerceResult};
use crate::implementation::inventory_ledger::InventoryLedger;
use crate::store::CommerceStore;
use crate::types::inventory::HoldId;
use crate::types::CommerceConfig;

/// Summary of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Holds released this pass.
    pub released_holds:    u32,
    /// Units of reservation returned to availability.
    pub released_quantity: u64,
}

/// Releases expired stock holds.
///
/// The host schedules [`run_once`](Self::run_once) every
/// [`interval`](Self::interval); each expired hold is released in its own
/// transaction so one poisoned hold cannot block the rest of the pass.
#[derive(Debug, Clone)]
pub struct ReservationSweeper {
    store:    CommerceStore,
    ledger:   InventoryLedger,
    interval: Duration,
}

impl ReservationSweeper {
    /// Creates a sweeper over a store.
    #[must_use]
    pub fn new(store: CommerceStore, config: &CommerceConfig) -> Self {
        Self {
            store,
            ledger: InventoryLedger::new(config),
            interval: config.sweep_interval,
        }
    }

    /// How often the host should run a pass.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one sweep pass at `now`.
    ///
    /// Idempotent: a hold released by a concurrent pass reads back as
    /// missing and is skipped.
    pub fn run_once(&self, now: DateTime<Utc>) -> CommerceResult<SweepReport> {
        let expired: Vec<HoldId> = self.store.transaction(|tx| {
            Ok(tx.holds().filter(|h| h.is_expired(now)).map(|h| h.id.clone()).collect())
        })?;

        let mut report = SweepReport::default();
        for hold_id in expired {
            match self.store.transaction(|tx| self.ledger.release_hold(tx, &hold_id)) {
                Ok(quantity) => {
                    report.released_holds += 1;
                    report.released_quantity += u64::from(quantity);
                },
                Err(CommerceError::NotFound { .. }) => {},
                Err(e) => return Err(e),
            }
        }

        if report.released_holds > 0 {
            tracing::info!(
                holds = report.released_holds,
                quantity = report.released_quantity,
                "released expired reservations"
            );
        }
        Ok(report)
    }
}
