// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use crate::errors::CommerceError;
    use crate::implementation::inventory_ledger::InventoryLedger;
    use crate::store::CommerceStore;
    use crate::types::catalog::{Currency, CustomerId, Product, ProductId};
    use crate::types::inventory::{InventoryChangeType, StockKey};
    use crate::types::CommerceConfig;

    fn setup() -> (CommerceStore, InventoryLedger) {
        init_tracing();
        let config = CommerceConfig::default();
        let store = CommerceStore::new(Duration::from_secs(10));
        (store, InventoryLedger::new(&config))
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn key(id: &'static str) -> StockKey {
        StockKey::product(ProductId::from_static(id))
    }

    #[test]
    fn test_restock_creates_row_lazily() {
        let (store, ledger) = setup();
        let key = key("prod-001");

        store
            .transaction(|tx| ledger.restock(tx, &key, 100, "PO-001"))
            .expect("restock");

        store
            .transaction(|tx| {
                let record = tx.inventory(&key)?;
                assert_eq!(record.stock_quantity, 100);
                assert_eq!(record.reserved_quantity, 0);
                assert_eq!(record.available(), 100);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_reserve_holds_stock() {
        let (store, ledger) = setup();
        let key = key("prod-001");
        let customer = CustomerId::new("cust-1");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 100, "PO-001")?;
                ledger.reserve(tx, &key, 30, &customer, Utc::now())
            })
            .expect("reserve");

        store
            .transaction(|tx| {
                let record = tx.inventory(&key)?;
                assert_eq!(record.stock_quantity, 100);
                assert_eq!(record.reserved_quantity, 30);
                assert_eq!(record.available(), 70);
                assert_eq!(tx.holds().count(), 1);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_reserve_insufficient_stock() {
        let (store, ledger) = setup();
        let key = key("prod-001");
        let customer = CustomerId::new("cust-1");

        let result = store.transaction(|tx| {
            ledger.restock(tx, &key, 10, "PO-001")?;
            ledger.reserve(tx, &key, 50, &customer, Utc::now())
        });

        match result {
            Err(CommerceError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, 10);
                assert_eq!(requested, 50);
            },
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_commit_sale_consumes_reservation() {
        let (store, ledger) = setup();
        let key = key("prod-001");
        let customer = CustomerId::new("cust-1");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 100, "PO-001")?;
                ledger.reserve(tx, &key, 30, &customer, Utc::now())?;
                ledger.commit_sale(tx, &key, 30, "ORD-001")
            })
            .expect("sale");

        store
            .transaction(|tx| {
                let record = tx.inventory(&key)?;
                assert_eq!(record.stock_quantity, 70);
                assert_eq!(record.reserved_quantity, 0);
                assert_eq!(record.available(), 70);
                // The hold backing the reservation is gone with it.
                assert_eq!(tx.holds().count(), 0);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_partial_sale_shrinks_hold() {
        let (store, ledger) = setup();
        let key = key("prod-001");
        let customer = CustomerId::new("cust-1");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 100, "PO-001")?;
                ledger.reserve(tx, &key, 30, &customer, Utc::now())?;
                ledger.commit_sale(tx, &key, 10, "ORD-001")
            })
            .expect("sale");

        store
            .transaction(|tx| {
                let record = tx.inventory(&key)?;
                assert_eq!(record.stock_quantity, 90);
                assert_eq!(record.reserved_quantity, 20);
                let hold = tx.holds().next().expect("hold");
                assert_eq!(hold.quantity, 20);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_sale_exceeding_reservation_clamps() {
        let (store, ledger) = setup();
        let key = key("prod-001");
        let customer = CustomerId::new("cust-1");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 100, "PO-001")?;
                ledger.reserve(tx, &key, 10, &customer, Utc::now())?;
                ledger.commit_sale(tx, &key, 30, "ORD-001")
            })
            .expect("sale");

        store
            .transaction(|tx| {
                let record = tx.inventory(&key)?;
                assert_eq!(record.stock_quantity, 70);
                assert_eq!(record.reserved_quantity, 0);
                assert_eq!(tx.holds().count(), 0);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_commit_sale_without_row() {
        let (store, ledger) = setup();
        let key = key("prod-missing");

        let result = store.transaction(|tx| ledger.commit_sale(tx, &key, 1, "ORD-001"));
        assert!(matches!(result, Err(CommerceError::NotFound { .. })));
    }

    #[test]
    fn test_restore_writes_return_row() {
        let (store, ledger) = setup();
        let key = key("prod-001");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 10, "PO-001")?;
                ledger.commit_sale(tx, &key, 3, "ORD-001")?;
                ledger.restore(tx, &key, 3, "order cancelled")
            })
            .expect("restore");

        store
            .transaction(|tx| {
                assert_eq!(tx.inventory(&key)?.stock_quantity, 10);
                let returns: Vec<_> = tx
                    .inventory_log()
                    .iter()
                    .filter(|e| e.change_type == InventoryChangeType::Return)
                    .collect();
                assert_eq!(returns.len(), 1);
                assert_eq!(returns[0].quantity_changed, 3);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_release_reservation_clamps_underflow() {
        let (store, ledger) = setup();
        let key = key("prod-001");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 10, "PO-001")?;
                // Nothing reserved; a release must clamp, not wrap.
                ledger.release_reservation(tx, &key, 5)
            })
            .expect("release");

        store
            .transaction(|tx| {
                assert_eq!(tx.inventory(&key)?.reserved_quantity, 0);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_adjust_sets_absolute_count() {
        let (store, ledger) = setup();
        let key = key("prod-001");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 100, "PO-001")?;
                ledger.adjust(tx, &key, 42, "cycle count")
            })
            .expect("adjust");

        store
            .transaction(|tx| {
                assert_eq!(tx.inventory(&key)?.stock_quantity, 42);
                let manual = tx
                    .inventory_log()
                    .iter()
                    .find(|e| e.change_type == InventoryChangeType::Manual)
                    .expect("manual row");
                assert_eq!(manual.quantity_changed, -58);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_adjust_below_reservation_clamps() {
        let (store, ledger) = setup();
        let key = key("prod-001");
        let customer = CustomerId::new("cust-1");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 20, "PO-001")?;
                ledger.reserve(tx, &key, 15, &customer, Utc::now())?;
                ledger.adjust(tx, &key, 5, "shrinkage")
            })
            .expect("adjust");

        store
            .transaction(|tx| {
                let record = tx.inventory(&key)?;
                assert_eq!(record.stock_quantity, 5);
                assert!(record.reserved_quantity <= record.stock_quantity);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_history_most_recent_first() {
        let (store, ledger) = setup();
        let key = key("prod-001");

        store
            .transaction(|tx| {
                ledger.restock(tx, &key, 100, "first")?;
                ledger.commit_sale(tx, &key, 10, "second")?;
                ledger.restore(tx, &key, 10, "third")
            })
            .expect("ops");

        store
            .transaction(|tx| {
                let history = ledger.history(tx, &key, None);
                assert_eq!(history.len(), 3);
                let limited = ledger.history(tx, &key, Some(2));
                assert_eq!(limited.len(), 2);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_low_stock_detection() {
        let (store, ledger) = setup();
        let key = key("prod-001");

        store
            .transaction(|tx| ledger.restock(tx, &key, 5, "PO-001"))
            .expect("restock");

        store
            .transaction(|tx| {
                assert_eq!(ledger.low_stock(tx).len(), 1);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_mirror_refresh_on_sale() {
        let (store, ledger) = setup();
        let product_id = ProductId::from_static("prod-001");
        let key = StockKey::product(product_id.clone());

        store
            .transaction(|tx| {
                tx.put_product(Product::new(
                    product_id.clone(),
                    "Widget",
                    5_000,
                    Currency::usd(),
                ))?;
                ledger.restock(tx, &key, 10, "PO-001")?;
                ledger.commit_sale(tx, &key, 4, "ORD-001")
            })
            .expect("ops");

        store
            .transaction(|tx| {
                assert_eq!(tx.product(&product_id)?.stock_quantity, 6);
                Ok(())
            })
            .expect("read");
    }

    // ------------------------------------------------------------------------
    // Invariants under arbitrary op sequences
    // ------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum LedgerOp {
        Restock(u32),
        Reserve(u32),
        Sale(u32),
        Release(u32),
        Adjust(u32),
    }

    fn ledger_op() -> impl proptest::strategy::Strategy<Value = LedgerOp> {
        use proptest::prelude::*;
        prop_oneof![
            (1..50u32).prop_map(LedgerOp::Restock),
            (0..50u32).prop_map(LedgerOp::Reserve),
            (0..50u32).prop_map(LedgerOp::Sale),
            (0..50u32).prop_map(LedgerOp::Release),
            (0..80u32).prop_map(LedgerOp::Adjust),
        ]
    }

    proptest::proptest! {
        // After any sequence of ledger ops, with failed ops rolled back:
        //   reserved <= stock, available = stock - reserved, and the
        //   log's signed deltas sum to the physical count.
        #[test]
        fn prop_ledger_invariants_hold(ops in proptest::collection::vec(ledger_op(), 1..40)) {
            let (store, ledger) = setup();
            let key = key("prod-prop");
            let customer = CustomerId::new("cust-prop");

            for op in ops {
                let _ = store.transaction(|tx| match op {
                    LedgerOp::Restock(q) => ledger.restock(tx, &key, q, "prop"),
                    LedgerOp::Reserve(q) => {
                        ledger.reserve(tx, &key, q, &customer, Utc::now()).map(|_| ())
                    },
                    LedgerOp::Sale(q) => ledger.commit_sale(tx, &key, q, "prop"),
                    LedgerOp::Release(q) => ledger.release_reservation(tx, &key, q),
                    LedgerOp::Adjust(q) => ledger.adjust(tx, &key, q, "prop"),
                });

                let snapshot = store
                    .transaction(|tx| {
                        Ok(tx.inventory(&key).ok().map(|record| {
                            let delta_sum: i64 =
                                tx.inventory_log().iter().map(|e| e.quantity_changed).sum();
                            (
                                record.stock_quantity,
                                record.reserved_quantity,
                                record.available(),
                                delta_sum,
                            )
                        }))
                    })
                    .expect("read");

                // No row yet means every op so far rolled back.
                if let Some((stock, reserved, available, delta_sum)) = snapshot {
                    proptest::prop_assert!(reserved <= stock);
                    proptest::prop_assert_eq!(available, stock - reserved);
                    proptest::prop_assert_eq!(delta_sum, i64::from(stock));
                }
            }
        }
    }

    #[test]
    fn test_rollback_on_failure_leaves_no_partial_writes() {
        let (store, ledger) = setup();
        let key = key("prod-001");

        store
            .transaction(|tx| ledger.restock(tx, &key, 10, "PO-001"))
            .expect("restock");

        // Second op fails after the first succeeded; neither may stick.
        let result = store.transaction(|tx| {
            ledger.commit_sale(tx, &key, 5, "ORD-001")?;
            ledger.commit_sale(tx, &key, 50, "ORD-001")
        });
        assert!(result.is_err());

        store
            .transaction(|tx| {
                assert_eq!(tx.inventory(&key)?.stock_quantity, 10);
                assert_eq!(ledger.history(tx, &key, None).len(), 1);
                Ok(())
            })
            .expect("read");
    }
}
