//! Live integration tests for pimsync-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need a reachable `DATABASE_URL` and are ignored
//! by default: `cargo test -p pimsync-db -- --ignored`.

use pimsync_core::{CatalogImage, CatalogProduct, CatalogVariant, CountryPrice, LocaleContent};
use pimsync_db::{
    clear_buy_prices, complete_sync_run, create_sync_run, fail_sync_run, get_buy_price,
    get_product_by_external_id, get_sync_run, list_business_key_owners,
    list_prices_for_key, list_product_external_ids, list_sync_runs, replace_prices_for_key,
    replace_product_children, start_sync_run, update_variant_by_ean, upsert_buy_price,
    upsert_product, DbError,
};
use rust_decimal::Decimal;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn variant(external_id: i64, ean: Option<&str>) -> CatalogVariant {
    CatalogVariant {
        external_id,
        title: Some("Wit".to_string()),
        ean: ean.map(str::to_string),
        sku: Some(format!("SKU-{external_id}")),
        article_code: None,
        stock_level: Some(5),
        prices: vec![],
    }
}

fn product(external_id: i64, variants: Vec<CatalogVariant>) -> CatalogProduct {
    CatalogProduct {
        external_id,
        title: format!("Product {external_id}"),
        brand: Some("Honeywell".to_string()),
        is_visible: true,
        images: vec![CatalogImage {
            external_id: Some(1),
            src: "https://cdn.example.com/1.jpg".to_string(),
            title: None,
            sort_order: Some(1),
        }],
        variants,
        contents: vec![LocaleContent {
            locale: "nl".to_string(),
            title: format!("Product {external_id}"),
            full_title: None,
            description: None,
        }],
    }
}

async fn write(pool: &sqlx::PgPool, product: &CatalogProduct) -> i64 {
    let id = upsert_product(pool, product)
        .await
        .expect("upsert_product failed");
    replace_product_children(
        pool,
        id,
        &product.images,
        &product.variants,
        &product.contents,
    )
    .await
    .expect("replace_product_children failed");
    id
}

async fn count(pool: &sqlx::PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("count on {table} failed: {e}"))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_product_is_keyed_on_external_id(pool: sqlx::PgPool) {
    let first = write(&pool, &product(10, vec![variant(1, Some("111"))])).await;
    let mut renamed = product(10, vec![variant(1, Some("111"))]);
    renamed.title = "Renamed".to_string();
    let second = write(&pool, &renamed).await;

    assert_eq!(first, second, "same external id must map to one row");
    assert_eq!(count(&pool, "products").await, 1);
    let row = get_product_by_external_id(&pool, 10).await.unwrap();
    assert_eq!(row.title, "Renamed");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn replace_children_is_replace_all(pool: sqlx::PgPool) {
    write(
        &pool,
        &product(10, vec![variant(1, Some("111")), variant(2, Some("222"))]),
    )
    .await;
    write(&pool, &product(10, vec![variant(3, Some("333"))])).await;

    assert_eq!(count(&pool, "product_variants").await, 1);
    assert_eq!(count(&pool, "product_images").await, 1);
    assert_eq!(count(&pool, "product_contents").await, 1);

    let owners = list_business_key_owners(&pool).await.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].ean, "333");
    assert_eq!(owners[0].product_external_id, 10);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_ean_across_products_is_rejected_atomically(pool: sqlx::PgPool) {
    write(&pool, &product(10, vec![variant(1, Some("4006381333931"))])).await;

    let other = product(20, vec![variant(2, Some("4006381333931"))]);
    let id = upsert_product(&pool, &other).await.unwrap();
    let err = replace_product_children(&pool, id, &other.images, &other.variants, &other.contents)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlx(_)));

    // The failed transaction must not leave images behind for product 20.
    let images: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM product_images WHERE product_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(images, 0);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_product_external_ids_is_sorted(pool: sqlx::PgPool) {
    write(&pool, &product(30, vec![])).await;
    write(&pool, &product(10, vec![])).await;
    assert_eq!(list_product_external_ids(&pool).await.unwrap(), vec![10, 30]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_variant_by_ean_reports_missing_key(pool: sqlx::PgPool) {
    write(&pool, &product(10, vec![variant(1, Some("111"))])).await;

    let mut changed = variant(1, Some("111"));
    changed.stock_level = Some(42);
    assert!(update_variant_by_ean(&pool, "111", &changed).await.unwrap());
    assert!(!update_variant_by_ean(&pool, "999", &changed).await.unwrap());

    let stock: Option<i32> =
        sqlx::query_scalar("SELECT stock_level FROM product_variants WHERE ean = '111'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stock, Some(42));
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn replace_prices_only_touches_one_key(pool: sqlx::PgPool) {
    let nl = |price: i64| CountryPrice {
        country: "NL".to_string(),
        price: Decimal::new(price, 2),
        compare_at_price: None,
    };
    replace_prices_for_key(&pool, "111", &[nl(1000)]).await.unwrap();
    replace_prices_for_key(&pool, "222", &[nl(2000)]).await.unwrap();
    replace_prices_for_key(&pool, "111", &[nl(1500)]).await.unwrap();

    let first = list_prices_for_key(&pool, "111").await.unwrap();
    let second = list_prices_for_key(&pool, "222").await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].price, Decimal::new(1500, 2));
    assert_eq!(second[0].price, Decimal::new(2000, 2));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn buy_prices_upsert_and_clear(pool: sqlx::PgPool) {
    upsert_buy_price(&pool, "111", Decimal::new(1250, 2), Some(7))
        .await
        .unwrap();
    upsert_buy_price(&pool, "111", Decimal::new(1300, 2), Some(7))
        .await
        .unwrap();

    let row = get_buy_price(&pool, "111").await.unwrap().unwrap();
    assert_eq!(row.cost_price, Decimal::new(1300, 2));

    assert_eq!(clear_buy_prices(&pool).await.unwrap(), 1);
    assert!(get_buy_price(&pool, "111").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Sync runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sync_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, "catalog", "cli")
        .await
        .expect("create_sync_run failed");
    assert_eq!(run.status, "queued");
    assert!(run.started_at.is_none());

    start_sync_run(&pool, run.id).await.unwrap();
    complete_sync_run(&pool, run.id, 12, &json!({"succeeded": 12}))
        .await
        .unwrap();

    let fetched = get_sync_run(&pool, run.id).await.unwrap();
    assert_eq!(fetched.status, "succeeded");
    assert_eq!(fetched.records_processed, 12);
    assert_eq!(fetched.summary, Some(json!({"succeeded": 12})));
    assert!(fetched.completed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sync_run_lifecycle_queued_to_failed(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, "buy_prices", "scheduler")
        .await
        .unwrap();
    start_sync_run(&pool, run.id).await.unwrap();
    fail_sync_run(&pool, run.id, "warehouse API key missing", None)
        .await
        .unwrap();

    let fetched = get_sync_run(&pool, run.id).await.unwrap();
    assert_eq!(fetched.status, "failed");
    assert_eq!(
        fetched.error_message.as_deref(),
        Some("warehouse API key missing")
    );
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sync_run_cannot_complete_directly_from_queued(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, "data", "api").await.unwrap();
    let err = complete_sync_run(&pool, run.id, 0, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidSyncRunTransition {
            expected_status: "running",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_sync_runs_is_newest_first(pool: sqlx::PgPool) {
    let first = create_sync_run(&pool, "catalog", "cli").await.unwrap();
    let second = create_sync_run(&pool, "data", "cli").await.unwrap();

    let runs = list_sync_runs(&pool, 10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, second.id);
    assert_eq!(runs[1].id, first.id);
}
