//! Database operations for `products` and their wholly-owned child
//! collections: `product_variants`, `product_images`, `product_contents`.

use chrono::{DateTime, Utc};
use pimsync_core::{CatalogImage, CatalogProduct, CatalogVariant, LocaleContent};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub external_id: i64,
    pub title: String,
    pub brand: Option<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which product currently owns a business key.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BusinessKeyOwnerRow {
    pub ean: String,
    pub product_external_id: i64,
    pub variant_external_id: i64,
}

// ---------------------------------------------------------------------------
// products
// ---------------------------------------------------------------------------

/// Upserts a product row keyed on `external_id`.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product(pool: &PgPool, product: &CatalogProduct) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (external_id, title, brand, is_visible) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (external_id) DO UPDATE SET \
             title      = EXCLUDED.title, \
             brand      = EXCLUDED.brand, \
             is_visible = EXCLUDED.is_visible, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(product.external_id)
    .bind(&product.title)
    .bind(&product.brand)
    .bind(product.is_visible)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches a product by its upstream id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_product_by_external_id(
    pool: &PgPool,
    external_id: i64,
) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(
        "SELECT id, external_id, title, brand, is_visible, created_at, updated_at \
         FROM products WHERE external_id = $1",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the upstream ids of every local product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_external_ids(pool: &PgPool) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT external_id FROM products ORDER BY external_id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Returns every claimed business key with the product that owns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_business_key_owners(pool: &PgPool) -> Result<Vec<BusinessKeyOwnerRow>, DbError> {
    let rows = sqlx::query_as::<_, BusinessKeyOwnerRow>(
        "SELECT v.ean, p.external_id AS product_external_id, v.external_id AS variant_external_id \
         FROM product_variants v \
         JOIN products p ON p.id = v.product_id \
         WHERE v.ean IS NOT NULL AND v.ean <> '' \
         ORDER BY v.ean",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// child collections
// ---------------------------------------------------------------------------

/// Replaces the images, variants and locale content of `product_id` with
/// exactly the given sets, in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is changed in
/// that case.
pub async fn replace_product_children(
    pool: &PgPool,
    product_id: i64,
    images: &[CatalogImage],
    variants: &[CatalogVariant],
    contents: &[LocaleContent],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    replace_images(&mut tx, product_id, images).await?;
    replace_variants(&mut tx, product_id, variants).await?;
    replace_contents(&mut tx, product_id, contents).await?;
    tx.commit().await?;
    Ok(())
}

async fn replace_images(
    conn: &mut PgConnection,
    product_id: i64,
    images: &[CatalogImage],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for image in images {
        sqlx::query(
            "INSERT INTO product_images (product_id, external_id, src, title, sort_order) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product_id)
        .bind(image.external_id)
        .bind(&image.src)
        .bind(&image.title)
        .bind(image.sort_order)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn replace_variants(
    conn: &mut PgConnection,
    product_id: i64,
    variants: &[CatalogVariant],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_variants WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for variant in variants {
        sqlx::query(
            "INSERT INTO product_variants \
                 (product_id, external_id, title, ean, sku, article_code, stock_level) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(product_id)
        .bind(variant.external_id)
        .bind(&variant.title)
        .bind(variant.business_key())
        .bind(&variant.sku)
        .bind(&variant.article_code)
        .bind(variant.stock_level)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn replace_contents(
    conn: &mut PgConnection,
    product_id: i64,
    contents: &[LocaleContent],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_contents WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for content in contents {
        sqlx::query(
            "INSERT INTO product_contents (product_id, locale, title, full_title, description) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product_id)
        .bind(&content.locale)
        .bind(&content.title)
        .bind(&content.full_title)
        .bind(&content.description)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// in-place variant updates
// ---------------------------------------------------------------------------

/// Updates the mutable fields of the variant owning `ean`.
///
/// Returns `false` when no local variant carries the key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_variant_by_ean(
    pool: &PgPool,
    ean: &str,
    variant: &CatalogVariant,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE product_variants SET \
             title        = COALESCE($2, title), \
             sku          = $3, \
             article_code = $4, \
             stock_level  = $5, \
             updated_at   = NOW() \
         WHERE ean = $1",
    )
    .bind(ean)
    .bind(&variant.title)
    .bind(&variant.sku)
    .bind(&variant.article_code)
    .bind(variant.stock_level)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
