//! Postgres persistence for the catalog mirror, buy prices and sync run
//! history.

pub mod buy_prices;
pub mod catalog;
mod error;
mod pool;
pub mod prices;
pub mod sync_runs;

pub use buy_prices::{clear_buy_prices, get_buy_price, upsert_buy_price, BuyPriceRow};
pub use catalog::{
    get_product_by_external_id, list_business_key_owners, list_product_external_ids,
    replace_product_children, update_variant_by_ean, upsert_product, BusinessKeyOwnerRow,
    ProductRow,
};
pub use error::DbError;
pub use pool::{connect_pool, health_check, run_migrations, PoolConfig};
pub use prices::{list_prices_for_key, replace_prices_for_key, PriceRow};
pub use sync_runs::{
    complete_sync_run, create_sync_run, fail_sync_run, get_sync_run, list_sync_runs,
    start_sync_run, SyncRunRow,
};
