//! Source traits the sync jobs consume. The live implementations wrap the
//! OMS and warehouse clients; tests substitute in-memory fakes.

use async_trait::async_trait;
use pimsync_core::{CatalogProduct, CatalogVariant};

use crate::error::UpstreamError;
use crate::oms::{OmsClient, OmsProduct};
use crate::warehouse::{CostPriceLookup, WarehouseClient};

/// Paged source of parent records for the catalog sync.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    type Record: Send + Sync + 'static;

    /// One page of records with ids greater than `since_id`.
    async fn fetch_page(
        &self,
        since_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<Self::Record>, UpstreamError>;

    fn record_id(record: &Self::Record) -> i64;

    fn record_title(record: &Self::Record) -> &str;

    /// Resolves nested collections into a complete product.
    async fn enrich(&self, record: Self::Record) -> Result<CatalogProduct, UpstreamError>;
}

/// Live variant data for one business key, with the upstream parent it
/// belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSnapshot {
    pub product_external_id: Option<i64>,
    pub variant: CatalogVariant,
}

#[async_trait]
pub trait VariantSource: Send + Sync {
    /// Every upstream variant whose business key equals `ean` exactly.
    async fn variants_by_business_key(
        &self,
        ean: &str,
    ) -> Result<Vec<VariantSnapshot>, UpstreamError>;
}

#[async_trait]
pub trait BuyPriceSource: Send + Sync {
    async fn lookup_cost_price(&self, ean: &str) -> Result<CostPriceLookup, UpstreamError>;
}

#[async_trait]
impl CatalogSource for OmsClient {
    type Record = OmsProduct;

    async fn fetch_page(
        &self,
        since_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<OmsProduct>, UpstreamError> {
        self.fetch_products_page(since_id, limit).await
    }

    fn record_id(record: &OmsProduct) -> i64 {
        record.id
    }

    fn record_title(record: &OmsProduct) -> &str {
        &record.title
    }

    async fn enrich(&self, record: OmsProduct) -> Result<CatalogProduct, UpstreamError> {
        OmsClient::enrich(self, record).await
    }
}

#[async_trait]
impl VariantSource for OmsClient {
    async fn variants_by_business_key(
        &self,
        ean: &str,
    ) -> Result<Vec<VariantSnapshot>, UpstreamError> {
        let variants = self.variants_by_ean(ean).await?;
        Ok(variants
            .into_iter()
            .map(|variant| VariantSnapshot {
                product_external_id: variant.product.resource_id(),
                variant: self.to_catalog_variant(variant),
            })
            .collect())
    }
}

#[async_trait]
impl BuyPriceSource for WarehouseClient {
    async fn lookup_cost_price(&self, ean: &str) -> Result<CostPriceLookup, UpstreamError> {
        WarehouseClient::lookup_cost_price(self, ean).await
    }
}
