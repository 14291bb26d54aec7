//! Database operations for `prices`, keyed by `(ean, country)`.

use chrono::{DateTime, Utc};
use pimsync_core::CountryPrice;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    pub id: i64,
    pub ean: String,
    pub country: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

/// Deletes every price row for `ean` and inserts `prices`, in one
/// transaction. Rows for other keys are untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn replace_prices_for_key(
    pool: &PgPool,
    ean: &str,
    prices: &[CountryPrice],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM prices WHERE ean = $1")
        .bind(ean)
        .execute(&mut *tx)
        .await?;

    for price in prices {
        sqlx::query(
            "INSERT INTO prices (ean, country, price, compare_at_price) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(ean)
        .bind(&price.country)
        .bind(price.price)
        .bind(price.compare_at_price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_prices_for_key(pool: &PgPool, ean: &str) -> Result<Vec<PriceRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceRow>(
        "SELECT id, ean, country, price, compare_at_price, updated_at \
         FROM prices WHERE ean = $1 ORDER BY country",
    )
    .bind(ean)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
