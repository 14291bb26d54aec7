use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the buy-price sync writes its results.
///
/// `BulkRefresh` clears the whole `buy_prices` table once every lookup has
/// completed and repopulates it; `InPlace` upserts each found price as soon
/// as it is looked up and never deletes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyPriceMode {
    BulkRefresh,
    InPlace,
}

impl std::fmt::Display for BuyPriceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuyPriceMode::BulkRefresh => write!(f, "bulk_refresh"),
            BuyPriceMode::InPlace => write!(f, "in_place"),
        }
    }
}

impl std::str::FromStr for BuyPriceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bulk_refresh" => Ok(BuyPriceMode::BulkRefresh),
            "in_place" => Ok(BuyPriceMode::InPlace),
            other => Err(format!(
                "expected \"bulk_refresh\" or \"in_place\", got \"{other}\""
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub exclusions_path: PathBuf,
    pub cron_secret: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub oms_base_url: String,
    pub oms_api_key: Option<String>,
    pub oms_api_secret: Option<String>,
    pub oms_language: String,
    pub oms_country: String,
    pub warehouse_base_url: String,
    pub warehouse_api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub page_size: u32,
    pub page_delay_ms: u64,
    pub item_delay_ms: u64,
    pub batch_size: usize,
    pub buy_price_mode: BuyPriceMode,
    pub scheduler_enabled: bool,
    pub catalog_cron: String,
    pub buy_price_cron: String,
    pub data_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("exclusions_path", &self.exclusions_path)
            .field("database_url", &"[redacted]")
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("oms_base_url", &self.oms_base_url)
            .field("oms_api_key", &self.oms_api_key.as_ref().map(|_| "[redacted]"))
            .field(
                "oms_api_secret",
                &self.oms_api_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("oms_language", &self.oms_language)
            .field("oms_country", &self.oms_country)
            .field("warehouse_base_url", &self.warehouse_base_url)
            .field(
                "warehouse_api_key",
                &self.warehouse_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("page_size", &self.page_size)
            .field("page_delay_ms", &self.page_delay_ms)
            .field("item_delay_ms", &self.item_delay_ms)
            .field("batch_size", &self.batch_size)
            .field("buy_price_mode", &self.buy_price_mode)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("catalog_cron", &self.catalog_cron)
            .field("buy_price_cron", &self.buy_price_cron)
            .field("data_cron", &self.data_cron)
            .finish()
    }
}
