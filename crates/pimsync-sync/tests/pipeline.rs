//! End-to-end scenarios for the three sync jobs against in-memory fakes.

mod support;

use std::collections::HashSet;
use std::time::Duration;

use pimsync_core::BuyPriceMode;
use pimsync_sync::{
    run_buy_price_sync, run_catalog_sync, run_data_sync, ExclusionFilter, SyncResult,
    SyncSettings, SyncStatus,
};
use rust_decimal::Decimal;

use support::{product, variant, FakeCatalog, FakeVariants, FakeWarehouse, MemoryStore};

fn settings() -> SyncSettings {
    SyncSettings {
        page_delay: Duration::ZERO,
        item_delay: Duration::ZERO,
        ..SyncSettings::default()
    }
}

fn no_exclusions() -> ExclusionFilter {
    ExclusionFilter::default()
}

fn assert_arithmetic(result: &SyncResult) {
    assert_eq!(
        result.succeeded + result.failed + result.skipped_duplicate + result.skipped_incomplete,
        result.total_candidates,
        "candidate outcomes must add up: {result:?}"
    );
    assert_eq!(
        result.total_fetched,
        result.total_candidates + result.excluded,
        "fetched must equal candidates plus excluded: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Catalog sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalog_happy_path_writes_every_product() {
    let source = FakeCatalog::new(vec![
        product(1, "Thermostaat", vec![variant(11, Some("8712345678906"))]),
        product(2, "Radiatorknop", vec![variant(21, Some("8712345678913"))]),
    ]);
    let store = MemoryStore::new();

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert_eq!(result.total_fetched, 2);
    assert_eq!(result.total_candidates, 2);
    assert_eq!(result.succeeded, 2);
    assert!(result.errors.is_empty());
    assert!(result.success);
    assert_eq!(result.status, SyncStatus::Success);
    assert_eq!(store.owner_of("8712345678906"), Some(1));
    assert_eq!(store.owner_of("8712345678913"), Some(2));
    assert_eq!(store.prices_for("8712345678906").len(), 1);
    assert_arithmetic(&result);
}

#[tokio::test]
async fn duplicate_key_across_products_is_written_once() {
    let source = FakeCatalog::new(vec![
        product(1, "Klokthermostaat", vec![variant(11, Some("4006381333931"))]),
        product(2, "Klokthermostaat (oud)", vec![variant(21, Some("4006381333931"))]),
    ]);
    let store = MemoryStore::new();

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped_duplicate, 1);
    assert_eq!(result.duplicates.len(), 1);
    assert!(result.duplicates[0].contains("4006381333931"));
    assert!(result.success);
    assert_eq!(store.owner_of("4006381333931"), Some(1));
    assert!(store.product(2).is_none());
    assert_arithmetic(&result);
}

#[tokio::test]
async fn conflicting_variant_is_dropped_but_siblings_are_written() {
    let source = FakeCatalog::new(vec![
        product(1, "Zone valve", vec![variant(11, Some("1234567890123"))]),
        product(
            2,
            "Zone valve kit",
            vec![
                variant(21, Some("1234567890123")),
                variant(22, Some("1234567890130")),
            ],
        ),
    ]);
    let store = MemoryStore::new();

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert_eq!(result.succeeded, 2);
    assert_eq!(result.duplicates.len(), 1);
    assert_eq!(result.skip_reasons.get("variant_duplicate_key"), Some(&1));
    assert_eq!(store.owner_of("1234567890123"), Some(1));
    assert_eq!(store.owner_of("1234567890130"), Some(2));
    let kit = store.product(2).unwrap();
    assert_eq!(kit.product.variants.len(), 1);
    assert_arithmetic(&result);
}

#[tokio::test]
async fn key_owned_by_existing_product_is_not_reassigned() {
    let store = MemoryStore::new().with_product(product(
        9,
        "Existing",
        vec![variant(91, Some("5000000000001"))],
    ));
    let source = FakeCatalog::new(vec![product(
        1,
        "Newcomer",
        vec![variant(11, Some("5000000000001"))],
    )]);

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert_eq!(result.skipped_duplicate, 1);
    assert!(result.duplicates[0].contains("existing"));
    assert_eq!(store.owner_of("5000000000001"), Some(9));
}

#[tokio::test]
async fn total_upstream_outage_fails_with_single_error() {
    let mut source = FakeCatalog::new(vec![product(1, "Thermostaat", vec![variant(11, None)])]);
    source.fail_fetch = true;
    let store = MemoryStore::new();

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert!(!result.success);
    assert_eq!(result.status, SyncStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("service unavailable"));
    assert_eq!(result.total_fetched, 0);
    assert_eq!(result.total_candidates, 0);
    assert_eq!(result.succeeded, 0);
    assert_eq!(result.failed, 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn failing_to_load_existing_keys_is_fatal() {
    let source = FakeCatalog::new(vec![product(1, "Thermostaat", vec![variant(11, None)])]);
    let store = MemoryStore::new().failing_owner_listing();

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("failed to load existing business keys"));
    assert!(source.cursors().is_empty());
}

#[tokio::test]
async fn second_identical_run_is_idempotent() {
    let source = FakeCatalog::new(vec![
        product(1, "Thermostaat", vec![variant(11, Some("8712345678906"))]),
        product(
            2,
            "Radiatorknop",
            vec![variant(21, Some("8712345678913")), variant(22, None)],
        ),
    ]);
    let store = MemoryStore::new();

    let first = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;
    let after_first = store.snapshot();
    let second = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert_eq!(store.snapshot(), after_first);
    assert_eq!(first.succeeded, second.succeeded);
    assert_eq!(second.skipped_duplicate, 0);
    assert_eq!(store.product_count(), 2);
}

#[tokio::test]
async fn exclusion_filter_drops_matching_titles_before_reconciliation() {
    let source = FakeCatalog::new(vec![
        product(1, "Premium Vloerverwarming Set", vec![variant(11, Some("1111111111116"))]),
        product(2, "Verwarmingsklok", vec![variant(21, Some("2222222222222"))]),
    ]);
    let store = MemoryStore::new();
    let filter = ExclusionFilter::new(["vloerverwarming"]);

    let result = run_catalog_sync(&source, &store, &filter, &settings()).await;

    assert_eq!(result.excluded, 1);
    assert_eq!(result.total_candidates, 1);
    assert!(store.product(1).is_none());
    assert!(store.product(2).is_some());
    assert_arithmetic(&result);
}

#[tokio::test]
async fn mixed_run_keeps_report_arithmetic() {
    let mut source = FakeCatalog::new(vec![
        product(1, "Thermostaat", vec![variant(11, Some("1000000000001"))]),
        product(2, "Cadeaubon", vec![variant(21, Some("1000000000002"))]),
        product(3, "Lege doos", vec![]),
        product(4, "Dubbel", vec![variant(41, Some("1000000000001"))]),
        product(5, "Kapot", vec![variant(51, Some("1000000000005"))]),
        product(6, "Geweigerd", vec![variant(61, Some("1000000000006"))]),
        product(7, "Zonder EAN", vec![variant(71, None)]),
    ]);
    source.fail_enrich = HashSet::from([5]);
    let store = MemoryStore::new().failing_upsert_for(6);
    let filter = ExclusionFilter::new(["cadeaubon"]);
    let settings = SyncSettings {
        page_size: 3,
        batch_size: 2,
        ..settings()
    };

    let result = run_catalog_sync(&source, &store, &filter, &settings).await;

    assert_eq!(result.total_fetched, 7);
    assert_eq!(result.excluded, 1);
    assert_eq!(result.total_candidates, 6);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 2);
    assert_eq!(result.skipped_duplicate, 1);
    assert_eq!(result.skipped_incomplete, 1);
    assert_eq!(result.skip_reasons.get("no_variants"), Some(&1));
    assert_eq!(result.skip_reasons.get("price_missing_business_key"), Some(&1));
    assert_eq!(result.error_count, 2);
    assert!(result.success);
    assert_eq!(result.status, SyncStatus::Partial);
    assert_arithmetic(&result);
}

#[tokio::test]
async fn price_write_failure_fails_product_but_keeps_going() {
    let source = FakeCatalog::new(vec![
        product(1, "Thermostaat", vec![variant(11, Some("8712345678906"))]),
        product(2, "Radiatorknop", vec![variant(21, Some("8712345678913"))]),
    ]);
    let store = MemoryStore::new().failing_prices_for("8712345678906");

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings()).await;

    assert_eq!(result.failed, 1);
    assert_eq!(result.succeeded, 1);
    assert!(result.errors[0].contains("EAN 8712345678906"));
    assert!(store.product(1).is_some());
    assert_arithmetic(&result);
}

#[tokio::test]
async fn pages_are_requested_by_since_id_until_short_page() {
    let products = (1..=5)
        .map(|id| product(id, &format!("Product {id}"), vec![variant(id * 10, None)]))
        .collect();
    let source = FakeCatalog::new(products);
    let store = MemoryStore::new();
    let settings = SyncSettings {
        page_size: 2,
        ..settings()
    };

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings).await;

    assert_eq!(result.total_fetched, 5);
    assert_eq!(source.cursors(), vec![None, Some(2), Some(4)]);
}

#[tokio::test]
async fn catalog_sync_resumes_after_since_id() {
    let products = (1..=5)
        .map(|id| product(id, &format!("Product {id}"), vec![variant(id * 10, None)]))
        .collect();
    let source = FakeCatalog::new(products);
    let store = MemoryStore::new();
    let settings = SyncSettings {
        since_id: Some(3),
        ..settings()
    };

    let result = run_catalog_sync(&source, &store, &no_exclusions(), &settings).await;

    assert_eq!(result.total_fetched, 2);
    assert_eq!(source.cursors(), vec![Some(3)]);
    assert!(store.product(3).is_none());
}

// ---------------------------------------------------------------------------
// Buy-price sync
// ---------------------------------------------------------------------------

fn catalog_with_keys(keys: &[&str]) -> MemoryStore {
    keys.iter()
        .enumerate()
        .fold(MemoryStore::new(), |store, (n, key)| {
            let id = i64::try_from(n).unwrap() + 1;
            store.with_product(product(id, "Thermostaat", vec![variant(id * 10, Some(key))]))
        })
}

#[tokio::test]
async fn buy_price_happy_path_refreshes_table() {
    let store = catalog_with_keys(&["8712345678906", "8712345678913"])
        .with_buy_price("9999999999999", Decimal::ONE);
    let warehouse = FakeWarehouse::default()
        .found("8712345678906", 1, Decimal::new(1250, 2))
        .found("8712345678913", 2, Decimal::new(399, 2));

    let result = run_buy_price_sync(&warehouse, &store, &settings()).await;

    assert_eq!(result.total_candidates, 2);
    assert_eq!(result.successful_lookups, 2);
    assert_eq!(result.succeeded, 2);
    assert!(result.errors.is_empty());
    assert!(result.success);
    assert_eq!(store.buy_price("8712345678906"), Some(Decimal::new(1250, 2)));
    assert_eq!(store.buy_price("9999999999999"), None);
    assert_eq!(store.buy_price_count(), 2);
    assert_arithmetic(&result);
}

#[tokio::test]
async fn buy_price_skips_missing_and_costless_products() {
    let store = catalog_with_keys(&["1000000000001", "1000000000002", "1000000000003"]);
    let warehouse = FakeWarehouse::default()
        .found("1000000000001", 1, Decimal::TEN)
        .without_cost("1000000000002", 2);

    let result = run_buy_price_sync(&warehouse, &store, &settings()).await;

    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped_incomplete, 2);
    assert_eq!(result.skip_reasons.get("no_cost_price"), Some(&1));
    assert_eq!(result.skip_reasons.get("not_found_upstream"), Some(&1));
    assert!(result.errors.is_empty());
    assert_arithmetic(&result);
}

#[tokio::test]
async fn in_place_mode_never_deletes_rows() {
    let store = catalog_with_keys(&["1000000000001"]).with_buy_price("9999999999999", Decimal::ONE);
    let warehouse = FakeWarehouse::default().found("1000000000001", 1, Decimal::TEN);
    let settings = SyncSettings {
        buy_price_mode: BuyPriceMode::InPlace,
        ..settings()
    };

    let result = run_buy_price_sync(&warehouse, &store, &settings).await;

    assert!(result.success);
    assert_eq!(store.buy_price("9999999999999"), Some(Decimal::ONE));
    assert_eq!(store.buy_price("1000000000001"), Some(Decimal::TEN));
}

#[tokio::test]
async fn failed_lookups_keep_existing_rows_in_bulk_mode() {
    let store = catalog_with_keys(&["1000000000001", "1000000000002"])
        .with_buy_price("1000000000002", Decimal::ONE);
    let mut warehouse = FakeWarehouse::default().found("1000000000001", 1, Decimal::TEN);
    warehouse.failing.insert("1000000000002".to_owned());

    let result = run_buy_price_sync(&warehouse, &store, &settings()).await;

    assert_eq!(result.failed, 1);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.status, SyncStatus::Partial);
    assert_eq!(store.buy_price("1000000000002"), Some(Decimal::ONE));
    assert_eq!(store.buy_price("1000000000001"), Some(Decimal::TEN));
    assert_arithmetic(&result);
}

#[tokio::test]
async fn clear_failure_aborts_bulk_refresh() {
    let store = catalog_with_keys(&["1000000000001", "1000000000002"]).failing_clear();
    let warehouse = FakeWarehouse::default()
        .found("1000000000001", 1, Decimal::TEN)
        .found("1000000000002", 2, Decimal::TEN);

    let result = run_buy_price_sync(&warehouse, &store, &settings()).await;

    assert!(!result.success);
    assert_eq!(result.failed, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("failed to clear buy prices"));
    assert_eq!(store.buy_price_count(), 0);
    assert_arithmetic(&result);
}

// ---------------------------------------------------------------------------
// Data sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn data_sync_updates_variant_fields_and_prices() {
    let store = catalog_with_keys(&["8712345678906"]);
    let mut fresh = variant(10, Some("8712345678906"));
    fresh.sku = Some("TH-2024".to_owned());
    fresh.stock_level = Some(42);
    fresh.prices = vec![support::price("NL", 2499), support::price("BE", 2599)];
    let upstream = FakeVariants::default().with(1, fresh);

    let result = run_data_sync(&upstream, &store, &settings()).await;

    assert!(result.success);
    assert_eq!(result.successful_lookups, 1);
    assert_eq!(result.succeeded, 1);
    let local = store.variant_by_ean("8712345678906").unwrap();
    assert_eq!(local.sku.as_deref(), Some("TH-2024"));
    assert_eq!(local.stock_level, Some(42));
    assert_eq!(store.prices_for("8712345678906").len(), 2);
    assert_arithmetic(&result);
}

#[tokio::test]
async fn data_sync_classifies_missing_and_foreign_keys() {
    let store = catalog_with_keys(&["1000000000001", "1000000000002", "1000000000003"]);
    let mut upstream = FakeVariants::default()
        .with(1, variant(10, Some("1000000000001")))
        .with(77, variant(770, Some("1000000000002")));
    upstream.failing.insert("1000000000003".to_owned());

    let result = run_data_sync(&upstream, &store, &settings()).await;

    assert_eq!(result.total_candidates, 3);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped_duplicate, 1);
    assert_eq!(result.skip_reasons.get("owned_by_other_parent"), Some(&1));
    assert_eq!(result.failed, 1);
    assert_eq!(result.status, SyncStatus::Partial);
    assert_arithmetic(&result);
}

#[tokio::test]
async fn data_sync_without_upstream_match_is_incomplete() {
    let store = catalog_with_keys(&["1000000000001"]);

    let result = run_data_sync(&FakeVariants::default(), &store, &settings()).await;

    assert_eq!(result.skipped_incomplete, 1);
    assert_eq!(result.skip_reasons.get("not_found_upstream"), Some(&1));
    assert!(result.success);
}
