//! Order-management system integration: product listing, enrichment of
//! nested collections, and search by business key.

pub mod normalize;
pub mod types;

use futures::Stream;
use pimsync_core::{CatalogProduct, CatalogVariant};

use crate::client::ApiClient;
use crate::error::UpstreamError;
use crate::pagination::{paginate, PageOptions};

pub use normalize::{normalize_product, normalize_variant};
pub use types::{Linked, OmsProduct, OmsVariant};

use types::{OmsBrandResponse, OmsImage, OmsImagesResponse, OmsProductsResponse, OmsVariantsResponse};

#[derive(Debug, Clone)]
pub struct OmsClient {
    api: ApiClient,
    locale: String,
    country: String,
}

impl OmsClient {
    /// `locale` tags content rows; `country` tags price rows.
    #[must_use]
    pub fn new(api: ApiClient, locale: &str, country: &str) -> Self {
        Self {
            api,
            locale: locale.to_owned(),
            country: country.to_uppercase(),
        }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fetches one page of products with ids greater than `since_id`.
    ///
    /// # Errors
    ///
    /// Propagates [`UpstreamError`] from the underlying request.
    pub async fn fetch_products_page(
        &self,
        since_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<OmsProduct>, UpstreamError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(since_id) = since_id {
            query.push(("since_id", since_id.to_string()));
        }
        let response: OmsProductsResponse = self.api.request_as("products.json", &query).await?;
        Ok(response.products)
    }

    /// Streams every product page, resuming after `options.start`.
    pub fn products(
        &self,
        options: PageOptions<i64>,
    ) -> impl Stream<Item = Result<Vec<OmsProduct>, UpstreamError>> + '_ {
        paginate(
            options,
            move |since_id, limit| self.fetch_products_page(since_id, limit),
            last_product_id,
        )
    }

    /// Follows the product's resource links and builds the full catalog
    /// record. A product without a variants link has no variants.
    ///
    /// # Errors
    ///
    /// Propagates [`UpstreamError`] from any follow-up request.
    pub async fn enrich(&self, product: OmsProduct) -> Result<CatalogProduct, UpstreamError> {
        let variants = match product.variants.link() {
            Some(link) => {
                let response: OmsVariantsResponse = self.api.request_as(link, &[]).await?;
                response.variants
            }
            None => Vec::new(),
        };

        let images: Vec<OmsImage> = match product.images.link() {
            Some(link) => {
                let response: OmsImagesResponse = self.api.request_as(link, &[]).await?;
                response.images
            }
            None => Vec::new(),
        };

        let brand = match product.brand.link() {
            Some(link) => {
                let response: OmsBrandResponse = self.api.request_as(link, &[]).await?;
                Some(response.brand.title)
            }
            None => None,
        };

        Ok(normalize_product(
            product,
            variants,
            images,
            brand,
            &self.locale,
            &self.country,
        ))
    }

    /// Searches variants by EAN. The OMS matches loosely, so results are
    /// filtered to exact matches.
    ///
    /// # Errors
    ///
    /// Propagates [`UpstreamError`] from the underlying request.
    pub async fn variants_by_ean(&self, ean: &str) -> Result<Vec<OmsVariant>, UpstreamError> {
        let response: OmsVariantsResponse = self
            .api
            .request_as("variants.json", &[("ean", ean.to_owned())])
            .await?;
        Ok(response
            .variants
            .into_iter()
            .filter(|v| v.ean.as_deref().map(str::trim) == Some(ean))
            .collect())
    }

    pub(crate) fn to_catalog_variant(&self, variant: OmsVariant) -> CatalogVariant {
        normalize_variant(variant, &self.country)
    }
}

fn last_product_id(page: &[OmsProduct]) -> Option<i64> {
    page.iter().map(|p| p.id).max()
}
