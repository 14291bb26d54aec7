//! In-memory store and upstream fakes for pipeline tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use pimsync_core::{CatalogProduct, CatalogVariant, CountryPrice};
use pimsync_sync::{CatalogStore, KeyOwner, StoreError};
use pimsync_upstream::{
    BuyPriceSource, CatalogSource, CostPriceLookup, UpstreamError, VariantSnapshot, VariantSource,
};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn price(country: &str, amount: i64) -> CountryPrice {
    CountryPrice {
        country: country.to_owned(),
        price: Decimal::new(amount, 2),
        compare_at_price: None,
    }
}

pub fn variant(external_id: i64, ean: Option<&str>) -> CatalogVariant {
    CatalogVariant {
        external_id,
        title: Some(format!("Variant {external_id}")),
        ean: ean.map(str::to_owned),
        sku: Some(format!("SKU-{external_id}")),
        article_code: None,
        stock_level: Some(5),
        prices: vec![price("NL", 1999)],
    }
}

pub fn product(external_id: i64, title: &str, variants: Vec<CatalogVariant>) -> CatalogProduct {
    CatalogProduct {
        external_id,
        title: title.to_owned(),
        brand: Some("Honeywell".to_owned()),
        is_visible: true,
        images: vec![],
        variants,
        contents: vec![],
    }
}

pub fn outage() -> UpstreamError {
    UpstreamError::UnexpectedStatus {
        status: 503,
        url: "https://oms.test/products.json".to_owned(),
        body: "service unavailable".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredProduct {
    pub id: i64,
    pub product: CatalogProduct,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    products: BTreeMap<i64, StoredProduct>,
    prices: BTreeMap<(String, String), CountryPrice>,
    buy_prices: BTreeMap<String, (Decimal, Option<i64>)>,
}

/// Mirrors the Postgres schema rules that matter to the pipeline: one
/// parent per external id and one variant per EAN across all parents.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_owner_listing: bool,
    fail_clear: bool,
    fail_prices_for: HashSet<String>,
    fail_upsert_for: HashSet<i64>,
    writes: Mutex<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_owner_listing(mut self) -> Self {
        self.fail_owner_listing = true;
        self
    }

    pub fn failing_clear(mut self) -> Self {
        self.fail_clear = true;
        self
    }

    pub fn failing_prices_for(mut self, ean: &str) -> Self {
        self.fail_prices_for.insert(ean.to_owned());
        self
    }

    pub fn failing_upsert_for(mut self, external_id: i64) -> Self {
        self.fail_upsert_for.insert(external_id);
        self
    }

    /// Seeds a product as if an earlier run had written it.
    pub fn with_product(self, product: CatalogProduct) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state
                .products
                .insert(product.external_id, StoredProduct { id, product });
        }
        self
    }

    pub fn with_buy_price(self, ean: &str, cost: Decimal) -> Self {
        self.state
            .lock()
            .unwrap()
            .buy_prices
            .insert(ean.to_owned(), (cost, None));
        self
    }

    pub fn product(&self, external_id: i64) -> Option<StoredProduct> {
        self.state.lock().unwrap().products.get(&external_id).cloned()
    }

    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    /// External id of the parent whose variant carries `ean`.
    pub fn owner_of(&self, ean: &str) -> Option<i64> {
        let state = self.state.lock().unwrap();
        state.products.values().find_map(|stored| {
            stored
                .product
                .variants
                .iter()
                .any(|v| v.business_key() == Some(ean))
                .then_some(stored.product.external_id)
        })
    }

    pub fn variant_by_ean(&self, ean: &str) -> Option<CatalogVariant> {
        let state = self.state.lock().unwrap();
        state
            .products
            .values()
            .flat_map(|stored| stored.product.variants.iter())
            .find(|v| v.business_key() == Some(ean))
            .cloned()
    }

    pub fn prices_for(&self, ean: &str) -> Vec<CountryPrice> {
        let state = self.state.lock().unwrap();
        state
            .prices
            .iter()
            .filter(|((key, _), _)| key == ean)
            .map(|(_, price)| price.clone())
            .collect()
    }

    pub fn buy_price(&self, ean: &str) -> Option<Decimal> {
        self.state
            .lock()
            .unwrap()
            .buy_prices
            .get(ean)
            .map(|(cost, _)| *cost)
    }

    pub fn buy_price_count(&self) -> usize {
        self.state.lock().unwrap().buy_prices.len()
    }

    pub fn write_count(&self) -> u64 {
        *self.writes.lock().unwrap()
    }

    /// Products, variants and prices, for comparing end states.
    pub fn snapshot(&self) -> (Vec<CatalogProduct>, Vec<CountryPrice>) {
        let state = self.state.lock().unwrap();
        (
            state.products.values().map(|s| s.product.clone()).collect(),
            state.prices.values().cloned().collect(),
        )
    }

    fn count_write(&self) {
        *self.writes.lock().unwrap() += 1;
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn business_key_owners(&self) -> Result<Vec<KeyOwner>, StoreError> {
        if self.fail_owner_listing {
            return Err(StoreError::Rejected("connection refused".to_owned()));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .products
            .values()
            .flat_map(|stored| {
                stored.product.variants.iter().filter_map(|v| {
                    v.business_key().map(|key| KeyOwner {
                        key: key.to_owned(),
                        product_external_id: stored.product.external_id,
                    })
                })
            })
            .collect())
    }

    async fn known_product_ids(&self) -> Result<Vec<i64>, StoreError> {
        Ok(self.state.lock().unwrap().products.keys().copied().collect())
    }

    async fn upsert_product(&self, product: &CatalogProduct) -> Result<i64, StoreError> {
        if self.fail_upsert_for.contains(&product.external_id) {
            return Err(StoreError::Rejected(format!(
                "product {} violates a constraint",
                product.external_id
            )));
        }
        self.count_write();
        let mut state = self.state.lock().unwrap();
        if let Some(stored) = state.products.get_mut(&product.external_id) {
            stored.product.title.clone_from(&product.title);
            stored.product.brand.clone_from(&product.brand);
            stored.product.is_visible = product.is_visible;
            return Ok(stored.id);
        }
        state.next_id += 1;
        let id = state.next_id;
        let mut parent = product.clone();
        parent.images.clear();
        parent.variants.clear();
        parent.contents.clear();
        state.products.insert(
            product.external_id,
            StoredProduct {
                id,
                product: parent,
            },
        );
        Ok(id)
    }

    async fn replace_children(
        &self,
        product_id: i64,
        product: &CatalogProduct,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut seen = HashSet::new();
        for key in product.business_keys() {
            if !seen.insert(key) {
                return Err(StoreError::Rejected(format!("duplicate EAN {key}")));
            }
            let taken = state.products.values().any(|stored| {
                stored.id != product_id
                    && stored
                        .product
                        .variants
                        .iter()
                        .any(|v| v.business_key() == Some(key))
            });
            if taken {
                return Err(StoreError::Rejected(format!("duplicate EAN {key}")));
            }
        }

        let stored = state
            .products
            .values_mut()
            .find(|stored| stored.id == product_id)
            .ok_or_else(|| StoreError::Rejected(format!("no product {product_id}")))?;
        stored.product.images.clone_from(&product.images);
        stored.product.variants.clone_from(&product.variants);
        stored.product.contents.clone_from(&product.contents);
        Ok(())
    }

    async fn replace_prices(&self, key: &str, prices: &[CountryPrice]) -> Result<(), StoreError> {
        if self.fail_prices_for.contains(key) {
            return Err(StoreError::Rejected(format!("price write for {key} refused")));
        }
        self.count_write();
        let mut state = self.state.lock().unwrap();
        state.prices.retain(|(ean, _), _| ean != key);
        for price in prices {
            state
                .prices
                .insert((key.to_owned(), price.country.clone()), price.clone());
        }
        Ok(())
    }

    async fn update_variant(
        &self,
        key: &str,
        variant: &CatalogVariant,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        let local = state
            .products
            .values_mut()
            .flat_map(|stored| stored.product.variants.iter_mut())
            .find(|v| v.business_key() == Some(key));
        let Some(local) = local else {
            return Ok(false);
        };
        if variant.title.is_some() {
            local.title.clone_from(&variant.title);
        }
        local.sku.clone_from(&variant.sku);
        local.article_code.clone_from(&variant.article_code);
        local.stock_level = variant.stock_level;
        drop(state);
        self.count_write();
        Ok(true)
    }

    async fn clear_buy_prices(&self) -> Result<u64, StoreError> {
        if self.fail_clear {
            return Err(StoreError::Rejected("permission denied".to_owned()));
        }
        let mut state = self.state.lock().unwrap();
        let removed = state.buy_prices.len() as u64;
        state.buy_prices.clear();
        Ok(removed)
    }

    async fn upsert_buy_price(
        &self,
        key: &str,
        cost_price: Decimal,
        warehouse_product_id: Option<i64>,
    ) -> Result<(), StoreError> {
        self.count_write();
        self.state
            .lock()
            .unwrap()
            .buy_prices
            .insert(key.to_owned(), (cost_price, warehouse_product_id));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Upstream fakes
// ---------------------------------------------------------------------------

/// Serves products in ascending id order, `since_id`-paged.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub products: Vec<CatalogProduct>,
    pub fail_fetch: bool,
    pub fail_enrich: HashSet<i64>,
    pub cursors: Mutex<Vec<Option<i64>>>,
}

impl FakeCatalog {
    pub fn new(mut products: Vec<CatalogProduct>) -> Self {
        products.sort_by_key(|p| p.external_id);
        Self {
            products,
            ..Self::default()
        }
    }

    pub fn cursors(&self) -> Vec<Option<i64>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    type Record = CatalogProduct;

    async fn fetch_page(
        &self,
        since_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<CatalogProduct>, UpstreamError> {
        self.cursors.lock().unwrap().push(since_id);
        if self.fail_fetch {
            return Err(outage());
        }
        let after = since_id.unwrap_or(i64::MIN);
        Ok(self
            .products
            .iter()
            .filter(|p| p.external_id > after)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn record_id(record: &CatalogProduct) -> i64 {
        record.external_id
    }

    fn record_title(record: &CatalogProduct) -> &str {
        &record.title
    }

    async fn enrich(&self, record: CatalogProduct) -> Result<CatalogProduct, UpstreamError> {
        if self.fail_enrich.contains(&record.external_id) {
            return Err(UpstreamError::MalformedResponse {
                context: format!("variants of product {}", record.external_id),
                reason: "missing \"variants\" key".to_owned(),
            });
        }
        Ok(record)
    }
}

#[derive(Debug, Default)]
pub struct FakeVariants {
    pub by_key: HashMap<String, Vec<VariantSnapshot>>,
    pub failing: HashSet<String>,
}

impl FakeVariants {
    pub fn with(mut self, parent: i64, variant: CatalogVariant) -> Self {
        let key = variant.ean.clone().unwrap_or_default();
        self.by_key.entry(key).or_default().push(VariantSnapshot {
            product_external_id: Some(parent),
            variant,
        });
        self
    }
}

#[async_trait]
impl VariantSource for FakeVariants {
    async fn variants_by_business_key(
        &self,
        ean: &str,
    ) -> Result<Vec<VariantSnapshot>, UpstreamError> {
        if self.failing.contains(ean) {
            return Err(outage());
        }
        Ok(self.by_key.get(ean).cloned().unwrap_or_default())
    }
}

/// Keys without an entry are not found.
#[derive(Debug, Default)]
pub struct FakeWarehouse {
    pub lookups: HashMap<String, CostPriceLookup>,
    pub failing: HashSet<String>,
}

impl FakeWarehouse {
    pub fn found(mut self, ean: &str, product_id: i64, cost: Decimal) -> Self {
        self.lookups.insert(
            ean.to_owned(),
            CostPriceLookup::Found {
                product_id,
                cost_price: cost,
            },
        );
        self
    }

    pub fn without_cost(mut self, ean: &str, product_id: i64) -> Self {
        self.lookups
            .insert(ean.to_owned(), CostPriceLookup::MissingCostPrice { product_id });
        self
    }
}

#[async_trait]
impl BuyPriceSource for FakeWarehouse {
    async fn lookup_cost_price(&self, ean: &str) -> Result<CostPriceLookup, UpstreamError> {
        if self.failing.contains(ean) {
            return Err(outage());
        }
        Ok(self
            .lookups
            .get(ean)
            .cloned()
            .unwrap_or(CostPriceLookup::NotFound))
    }
}
