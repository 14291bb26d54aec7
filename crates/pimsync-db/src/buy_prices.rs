//! Database operations for `buy_prices`, one row per business key.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuyPriceRow {
    pub ean: String,
    pub cost_price: Decimal,
    pub warehouse_product_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Deletes every buy price. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_buy_prices(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM buy_prices").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Inserts or replaces the buy price for `ean`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_buy_price(
    pool: &PgPool,
    ean: &str,
    cost_price: Decimal,
    warehouse_product_id: Option<i64>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO buy_prices (ean, cost_price, warehouse_product_id) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (ean) DO UPDATE SET \
             cost_price           = EXCLUDED.cost_price, \
             warehouse_product_id = EXCLUDED.warehouse_product_id, \
             updated_at           = NOW()",
    )
    .bind(ean)
    .bind(cost_price)
    .bind(warehouse_product_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_buy_price(pool: &PgPool, ean: &str) -> Result<Option<BuyPriceRow>, DbError> {
    let row = sqlx::query_as::<_, BuyPriceRow>(
        "SELECT ean, cost_price, warehouse_product_id, updated_at \
         FROM buy_prices WHERE ean = $1",
    )
    .bind(ean)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
