use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product fetched from the order-management system and resolved into the
/// shape the local catalog stores. Child collections are complete: the local
/// rows for this product are replaced by exactly these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Upstream primary key; the stable upsert key for the local product row.
    pub external_id: i64,
    pub title: String,
    pub brand: Option<String>,
    pub is_visible: bool,
    pub images: Vec<CatalogImage>,
    pub variants: Vec<CatalogVariant>,
    pub contents: Vec<LocaleContent>,
}

impl CatalogProduct {
    /// Returns the business keys carried by this product's variants, in
    /// upstream order.
    #[must_use]
    pub fn business_keys(&self) -> Vec<&str> {
        self.variants
            .iter()
            .filter_map(CatalogVariant::business_key)
            .collect()
    }
}

/// A purchasable variant of a [`CatalogProduct`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub external_id: i64,
    pub title: Option<String>,
    /// EAN barcode. Globally unique across all local variants.
    pub ean: Option<String>,
    pub sku: Option<String>,
    pub article_code: Option<String>,
    pub stock_level: Option<i32>,
    /// Price rows keyed by `(ean, country)`; only written when `ean` is set.
    pub prices: Vec<CountryPrice>,
}

impl CatalogVariant {
    /// The variant's business key, ignoring blank values.
    #[must_use]
    pub fn business_key(&self) -> Option<&str> {
        self.ean
            .as_deref()
            .map(str::trim)
            .filter(|ean| !ean.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryPrice {
    /// ISO 3166 alpha-2, upper case.
    pub country: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogImage {
    pub external_id: Option<i64>,
    pub src: String,
    pub title: Option<String>,
    pub sort_order: Option<i32>,
}

/// Localised copy for a product (one row per locale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleContent {
    pub locale: String,
    pub title: String,
    pub full_title: Option<String>,
    pub description: Option<String>,
}
