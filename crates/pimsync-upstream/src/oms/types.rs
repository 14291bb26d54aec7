//! Order-management system (OMS) response types.
//!
//! ## Observed shape
//!
//! ### Resource references
//! Nested collections are not embedded in the product listing. Each is a
//! reference object that must be followed with a second request:
//!
//! ```json
//! "variants": {"resource": {"id": false, "url": "variants?product=123",
//!              "link": "https://api.webshopapp.com/nl/variants.json?product=123"}}
//! ```
//!
//! A product without the collection carries the literal `false` instead of
//! an object. Any other shape is rejected at deserialization.
//!
//! ### Prices
//! `priceIncl` / `oldPriceIncl` are JSON numbers including VAT. An
//! `oldPriceIncl` of `0` means "no compare-at price".
//!
//! ### Collection keys
//! The images endpoint wraps its list as `productImages`; older API versions
//! used `images`. Both are accepted.
//!
//! ### Field naming
//! Fields are camelCase except `fulltitle`, which is lower case.

use rust_decimal::Decimal;
use serde::Deserialize;

/// A `{"resource": {...}}` reference or the literal `false`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Linked {
    Resource {
        resource: ResourceRef,
    },
    #[default]
    Absent,
}

impl<'de> Deserialize<'de> for Linked {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Resource { resource: ResourceRef },
            Flag(bool),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Resource { resource } => Ok(Linked::Resource { resource }),
            Wire::Flag(false) => Ok(Linked::Absent),
            Wire::Flag(true) => Err(serde::de::Error::invalid_value(
                serde::de::Unexpected::Bool(true),
                &"a resource reference or false",
            )),
        }
    }
}

impl Linked {
    /// The absolute link to follow, when the resource exists.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        match self {
            Linked::Resource { resource } => Some(resource.link.as_str()),
            Linked::Absent => None,
        }
    }

    /// The referenced resource's id, when the reference carries one.
    #[must_use]
    pub fn resource_id(&self) -> Option<i64> {
        match self {
            Linked::Resource { resource } => resource.id,
            Linked::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceRef {
    /// Numeric for single resources, `false` for collections.
    #[serde(default, deserialize_with = "id_or_false")]
    pub id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    pub link: String,
}

fn id_or_false<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdOrFlag {
        Id(i64),
        Flag(bool),
    }

    Ok(match Option::<IdOrFlag>::deserialize(deserializer)? {
        Some(IdOrFlag::Id(id)) => Some(id),
        Some(IdOrFlag::Flag(_)) | None => None,
    })
}

/// Response from `GET products.json`.
#[derive(Debug, Deserialize)]
pub struct OmsProductsResponse {
    pub products: Vec<OmsProduct>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmsProduct {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub fulltitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Long-form HTML body; preferred over `description` for content rows.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub brand: Linked,
    #[serde(default)]
    pub images: Linked,
    #[serde(default)]
    pub variants: Linked,
}

fn default_visible() -> bool {
    true
}

/// Response from a followed `variants` link or `variants.json?ean=`.
#[derive(Debug, Deserialize)]
pub struct OmsVariantsResponse {
    pub variants: Vec<OmsVariant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmsVariant {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ean: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub article_code: Option<String>,
    #[serde(default)]
    pub price_incl: Option<Decimal>,
    #[serde(default)]
    pub old_price_incl: Option<Decimal>,
    #[serde(default)]
    pub stock_level: Option<i32>,
    /// Back-reference to the owning product.
    #[serde(default)]
    pub product: Linked,
}

/// Response from a followed `images` link.
#[derive(Debug, Deserialize)]
pub struct OmsImagesResponse {
    #[serde(rename = "productImages", alias = "images")]
    pub images: Vec<OmsImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmsImage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    pub src: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// Response from a followed `brand` link.
#[derive(Debug, Deserialize)]
pub struct OmsBrandResponse {
    pub brand: OmsBrand,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmsBrand {
    pub id: i64,
    pub title: String,
}
