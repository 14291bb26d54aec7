//! Warehouse integration: cost-price lookup by barcode.
//!
//! `GET products?search=<term>` returns a JSON array of products matching
//! the term anywhere (name, product code, barcode). Only an exact barcode
//! match is trusted. `fixedstockprice` is `null` for products without a
//! configured cost price.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::UpstreamError;

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseProduct {
    pub idproduct: i64,
    #[serde(default)]
    pub productcode: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub fixedstockprice: Option<Decimal>,
}

/// Outcome of looking up one business key in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostPriceLookup {
    Found { product_id: i64, cost_price: Decimal },
    MissingCostPrice { product_id: i64 },
    NotFound,
    /// More than one warehouse product carries the barcode.
    Ambiguous { product_ids: Vec<i64> },
}

#[derive(Debug, Clone)]
pub struct WarehouseClient {
    api: ApiClient,
}

impl WarehouseClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// # Errors
    ///
    /// Propagates [`UpstreamError`] from the underlying request.
    pub async fn search_products(&self, term: &str) -> Result<Vec<WarehouseProduct>, UpstreamError> {
        self.api
            .request_as("products", &[("search", term.to_owned())])
            .await
    }

    /// # Errors
    ///
    /// Propagates [`UpstreamError`] from the underlying request.
    pub async fn lookup_cost_price(&self, ean: &str) -> Result<CostPriceLookup, UpstreamError> {
        let products = self.search_products(ean).await?;
        Ok(resolve_cost_price(ean, &products))
    }
}

/// Picks the product whose barcode equals `ean` exactly.
#[must_use]
pub fn resolve_cost_price(ean: &str, products: &[WarehouseProduct]) -> CostPriceLookup {
    let mut exact: Vec<&WarehouseProduct> = products
        .iter()
        .filter(|p| p.barcode.as_deref().map(str::trim) == Some(ean))
        .collect();
    exact.sort_by_key(|p| p.idproduct);
    exact.dedup_by_key(|p| p.idproduct);

    match exact.as_slice() {
        [] => CostPriceLookup::NotFound,
        [product] => match product.fixedstockprice {
            Some(cost_price) => CostPriceLookup::Found {
                product_id: product.idproduct,
                cost_price,
            },
            None => CostPriceLookup::MissingCostPrice {
                product_id: product.idproduct,
            },
        },
        many => CostPriceLookup::Ambiguous {
            product_ids: many.iter().map(|p| p.idproduct).collect(),
        },
    }
}
