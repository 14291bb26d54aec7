//! Persistence seam for the sync jobs.
//!
//! [`PgCatalogStore`] delegates to `pimsync-db`; the pipeline tests swap in
//! an in-memory implementation.

use async_trait::async_trait;
use pimsync_core::{CatalogProduct, CatalogVariant, CountryPrice};
use pimsync_db::DbError;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    /// The store refused a write (e.g. a uniqueness violation).
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// A business key and the external id of the parent that owns it locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOwner {
    pub key: String,
    pub product_external_id: i64,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn business_key_owners(&self) -> Result<Vec<KeyOwner>, StoreError>;

    async fn known_product_ids(&self) -> Result<Vec<i64>, StoreError>;

    /// Upserts the parent row; returns its local id.
    async fn upsert_product(&self, product: &CatalogProduct) -> Result<i64, StoreError>;

    /// Replaces images, variants and locale content of `product_id`
    /// atomically.
    async fn replace_children(
        &self,
        product_id: i64,
        product: &CatalogProduct,
    ) -> Result<(), StoreError>;

    async fn replace_prices(&self, key: &str, prices: &[CountryPrice]) -> Result<(), StoreError>;

    /// Returns `false` when no local variant carries `key`.
    async fn update_variant(&self, key: &str, variant: &CatalogVariant)
        -> Result<bool, StoreError>;

    async fn clear_buy_prices(&self) -> Result<u64, StoreError>;

    async fn upsert_buy_price(
        &self,
        key: &str,
        cost_price: Decimal,
        warehouse_product_id: Option<i64>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn business_key_owners(&self) -> Result<Vec<KeyOwner>, StoreError> {
        let rows = pimsync_db::list_business_key_owners(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| KeyOwner {
                key: row.ean,
                product_external_id: row.product_external_id,
            })
            .collect())
    }

    async fn known_product_ids(&self) -> Result<Vec<i64>, StoreError> {
        Ok(pimsync_db::list_product_external_ids(&self.pool).await?)
    }

    async fn upsert_product(&self, product: &CatalogProduct) -> Result<i64, StoreError> {
        Ok(pimsync_db::upsert_product(&self.pool, product).await?)
    }

    async fn replace_children(
        &self,
        product_id: i64,
        product: &CatalogProduct,
    ) -> Result<(), StoreError> {
        pimsync_db::replace_product_children(
            &self.pool,
            product_id,
            &product.images,
            &product.variants,
            &product.contents,
        )
        .await?;
        Ok(())
    }

    async fn replace_prices(&self, key: &str, prices: &[CountryPrice]) -> Result<(), StoreError> {
        pimsync_db::replace_prices_for_key(&self.pool, key, prices).await?;
        Ok(())
    }

    async fn update_variant(
        &self,
        key: &str,
        variant: &CatalogVariant,
    ) -> Result<bool, StoreError> {
        Ok(pimsync_db::update_variant_by_ean(&self.pool, key, variant).await?)
    }

    async fn clear_buy_prices(&self) -> Result<u64, StoreError> {
        Ok(pimsync_db::clear_buy_prices(&self.pool).await?)
    }

    async fn upsert_buy_price(
        &self,
        key: &str,
        cost_price: Decimal,
        warehouse_product_id: Option<i64>,
    ) -> Result<(), StoreError> {
        pimsync_db::upsert_buy_price(&self.pool, key, cost_price, warehouse_product_id).await?;
        Ok(())
    }
}
