//! Conversion from OMS wire records into catalog domain types.

use pimsync_core::{CatalogImage, CatalogProduct, CatalogVariant, CountryPrice, LocaleContent};
use rust_decimal::Decimal;

use super::types::{OmsImage, OmsProduct, OmsVariant};

/// Trims and drops empty strings; the OMS sends `""` for unset text fields.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Builds a [`CatalogProduct`] from a listing record plus its followed
/// collections.
#[must_use]
pub fn normalize_product(
    product: OmsProduct,
    variants: Vec<OmsVariant>,
    images: Vec<OmsImage>,
    brand: Option<String>,
    locale: &str,
    country: &str,
) -> CatalogProduct {
    let description = non_blank(product.content).or_else(|| non_blank(product.description));
    let content = LocaleContent {
        locale: locale.to_owned(),
        title: product.title.clone(),
        full_title: non_blank(product.fulltitle),
        description,
    };

    CatalogProduct {
        external_id: product.id,
        title: product.title,
        brand: non_blank(brand),
        is_visible: product.is_visible,
        images: images.into_iter().map(normalize_image).collect(),
        variants: variants
            .into_iter()
            .map(|variant| normalize_variant(variant, country))
            .collect(),
        contents: vec![content],
    }
}

/// Converts one OMS variant. A variant without `priceIncl` carries no price
/// rows; an `oldPriceIncl` of zero means no compare-at price.
#[must_use]
pub fn normalize_variant(variant: OmsVariant, country: &str) -> CatalogVariant {
    let prices = variant
        .price_incl
        .map(|price| CountryPrice {
            country: country.to_owned(),
            price,
            compare_at_price: variant.old_price_incl.filter(|p| *p > Decimal::ZERO),
        })
        .into_iter()
        .collect();

    CatalogVariant {
        external_id: variant.id,
        title: non_blank(variant.title),
        ean: non_blank(variant.ean),
        sku: non_blank(variant.sku),
        article_code: non_blank(variant.article_code),
        stock_level: variant.stock_level,
        prices,
    }
}

fn normalize_image(image: OmsImage) -> CatalogImage {
    CatalogImage {
        external_id: image.id,
        src: image.src,
        title: non_blank(image.title),
        sort_order: image.sort_order,
    }
}
