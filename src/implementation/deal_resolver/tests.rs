// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use crate::errors::CommerceError;
    use crate::implementation::deal_resolver::DealResolver;
    use crate::store::CommerceStore;
    use crate::types::catalog::{Currency, Product, ProductId, ProductVariant, VariantId};
    use crate::types::promotions::{DealLimits, DealStatus, DealType};

    fn setup() -> (CommerceStore, DealResolver, ProductId) {
        let store = CommerceStore::new(Duration::from_secs(10));
        let product_id = ProductId::from_static("prod-001");
        store
            .transaction(|tx| {
                tx.put_product(Product::new(
                    product_id.clone(),
                    "Widget",
                    10_000,
                    Currency::usd(),
                ))
            })
            .expect("seed");
        (store, DealResolver::new(), product_id)
    }

    fn jan(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_same_type_overlap_rejected() {
        let (store, resolver, product_id) = setup();

        store
            .transaction(|tx| {
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::Trending,
                    10,
                    jan(1),
                    jan(10),
                    DealLimits::default(),
                )
            })
            .expect("first trending deal");

        let overlap = store.transaction(|tx| {
            resolver.create_deal(
                tx,
                &product_id,
                DealType::Trending,
                15,
                jan(5),
                jan(15),
                DealLimits::default(),
            )
        });
        assert!(matches!(overlap, Err(CommerceError::Conflict(_))));

        // A different deal type may share the window.
        store
            .transaction(|tx| {
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::Flash,
                    15,
                    jan(5),
                    jan(15),
                    DealLimits::default(),
                )
            })
            .expect("flash deal");
    }

    #[test]
    fn test_overlap_boundaries_inclusive() {
        let (store, resolver, product_id) = setup();

        store
            .transaction(|tx| {
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::Flash,
                    10,
                    jan(1),
                    jan(10),
                    DealLimits::default(),
                )
            })
            .expect("deal");

        // Touching exactly at the boundary still conflicts.
        let touching = store.transaction(|tx| {
            resolver.create_deal(
                tx,
                &product_id,
                DealType::Flash,
                10,
                jan(10),
                jan(20),
                DealLimits::default(),
            )
        });
        assert!(matches!(touching, Err(CommerceError::Conflict(_))));
    }

    #[test]
    fn test_effective_price_applies_active_deal() {
        let (store, resolver, product_id) = setup();

        store
            .transaction(|tx| {
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::Flash,
                    20,
                    jan(1),
                    jan(10),
                    DealLimits::default(),
                )
            })
            .expect("deal");

        store
            .transaction(|tx| {
                let product = tx.product(&product_id)?.clone();
                assert_eq!(resolver.effective_price(tx, &product, None, jan(5)), 8_000);
                // Outside the window the base price applies.
                assert_eq!(resolver.effective_price(tx, &product, None, jan(20)), 10_000);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_base_price_precedence() {
        let (store, resolver, product_id) = setup();
        let variant_id = VariantId::from_static("var-001");

        store
            .transaction(|tx| {
                let mut product = tx.product(&product_id)?.clone();
                product.discount_price = Some(9_000);
                tx.put_product(product)?;
                tx.put_variant(
                    ProductVariant::new(variant_id.clone(), product_id.clone()).with_price(7_500),
                )
            })
            .expect("seed");

        store
            .transaction(|tx| {
                let product = tx.product(&product_id)?.clone();
                let variant = tx.variant(&variant_id)?.clone();
                // Variant override beats the product's promotional price.
                assert_eq!(
                    resolver.effective_price(tx, &product, Some(&variant), jan(5)),
                    7_500
                );
                // Promotional price beats the list price.
                assert_eq!(resolver.effective_price(tx, &product, None, jan(5)), 9_000);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_largest_discount_wins_when_windows_collide() {
        let (store, resolver, product_id) = setup();

        // Different types may overlap, so two deals can be active at once.
        store
            .transaction(|tx| {
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::Flash,
                    10,
                    jan(1),
                    jan(10),
                    DealLimits::default(),
                )?;
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::Trending,
                    25,
                    jan(1),
                    jan(10),
                    DealLimits::default(),
                )
            })
            .expect("deals");

        store
            .transaction(|tx| {
                let winner = resolver.active_deal(tx, &product_id, jan(5)).expect("deal");
                assert_eq!(winner.discount_percent, 25);
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn test_derived_status() {
        let (store, resolver, product_id) = setup();

        let deal = store
            .transaction(|tx| {
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::DealOfDay,
                    10,
                    jan(5),
                    jan(10),
                    DealLimits::default(),
                )
            })
            .expect("deal");

        assert_eq!(deal.status(jan(1)), DealStatus::Upcoming);
        assert_eq!(deal.status(jan(5)), DealStatus::Active);
        assert_eq!(deal.status(jan(10)), DealStatus::Active);
        assert_eq!(deal.status(jan(11)), DealStatus::Ended);
    }

    #[test]
    fn test_usage_caps() {
        let (store, resolver, product_id) = setup();
        let alice = crate::types::catalog::CustomerId::new("alice");
        let bob = crate::types::catalog::CustomerId::new("bob");

        let deal = store
            .transaction(|tx| {
                resolver.create_deal(
                    tx,
                    &product_id,
                    DealType::Flash,
                    10,
                    jan(1),
                    jan(10),
                    DealLimits { max_total_usage: Some(2), max_user_usage: Some(1) },
                )
            })
            .expect("deal");

        store
            .transaction(|tx| {
                let current = tx.deal(&deal.id)?.clone();
                assert!(resolver.check_limits(tx, &current, &alice));
                resolver.record_usage(tx, &deal.id, &alice)?;
                // Alice hit her per-user cap.
                let current = tx.deal(&deal.id)?.clone();
                assert!(!resolver.check_limits(tx, &current, &alice));
                assert!(resolver.check_limits(tx, &current, &bob));
                resolver.record_usage(tx, &deal.id, &bob)?;
                // Total cap of two now reached for everyone.
                let current = tx.deal(&deal.id)?.clone();
                assert!(!resolver.check_limits(
                    tx,
                    &current,
                    &crate::types::catalog::CustomerId::new("carol")
                ));
                Ok(())
            })
            .expect("usage");
    }

    #[test]
    fn test_template_instantiation() {
        let (store, resolver, product_id) = setup();

        let deal = store
            .transaction(|tx| {
                let template = resolver.create_template(
                    tx,
                    "Weekend flash",
                    DealType::Flash,
                    30,
                    Duration::from_secs(48 * 3600),
                    DealLimits::default(),
                )?;
                resolver.instantiate_template(tx, &template.id, &product_id, jan(3))
            })
            .expect("instantiate");

        assert_eq!(deal.deal_type, DealType::Flash);
        assert_eq!(deal.discount_percent, 30);
        assert_eq!(deal.end_time - deal.start_time, chrono::Duration::days(2));
    }

    #[test]
    fn test_invalid_percent_rejected() {
        let (store, resolver, product_id) = setup();

        let zero = store.transaction(|tx| {
            resolver.create_deal(
                tx,
                &product_id,
                DealType::Flash,
                0,
                jan(1),
                jan(2),
                DealLimits::default(),
            )
        });
        assert!(matches!(zero, Err(CommerceError::Validation(_))));

        let over = store.transaction(|tx| {
            resolver.create_deal(
                tx,
                &product_id,
                DealType::Flash,
                101,
                jan(1),
                jan(2),
                DealLimits::default(),
            )
        });
        assert!(matches!(over, Err(CommerceError::Validation(_))));
    }
}
