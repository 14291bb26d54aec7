use crate::app_config::{AppConfig, BuyPriceMode, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates with blank keys behave.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_as = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "value is empty".to_string(),
            });
        }
        Ok(raw)
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        parse_as(var, default)?
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_as(var, default)?
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        parse_as(var, default)?
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PIMSYNC_ENV", "development"))?;

    let bind_addr = parse_as("PIMSYNC_BIND_ADDR", "0.0.0.0:3000")?
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PIMSYNC_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PIMSYNC_LOG_LEVEL", "info");
    let exclusions_path = PathBuf::from(or_default(
        "PIMSYNC_EXCLUSIONS_PATH",
        "./config/exclusions.yaml",
    ));
    let cron_secret = optional("CRON_SECRET");

    let db_max_connections = parse_u32("PIMSYNC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PIMSYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PIMSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let oms_base_url = parse_as("PIMSYNC_OMS_BASE_URL", "https://api.webshopapp.com/nl/")?;
    let oms_api_key = optional("PIMSYNC_OMS_API_KEY");
    let oms_api_secret = optional("PIMSYNC_OMS_API_SECRET");
    let oms_language = parse_as("PIMSYNC_OMS_LANGUAGE", "nl")?;
    let oms_country = parse_as("PIMSYNC_OMS_COUNTRY", "NL")?.to_uppercase();

    let warehouse_base_url = parse_as(
        "PIMSYNC_WAREHOUSE_BASE_URL",
        "https://example.picqer.com/api/v1/",
    )?;
    let warehouse_api_key = optional("PIMSYNC_WAREHOUSE_API_KEY");

    let http_timeout_secs = parse_u64("PIMSYNC_HTTP_TIMEOUT_SECS", "30")?;
    let http_user_agent = or_default("PIMSYNC_HTTP_USER_AGENT", "pimsync/0.1 (catalog-sync)");
    let max_retries = parse_u32("PIMSYNC_MAX_RETRIES", "5")?;
    let retry_base_delay_ms = parse_u64("PIMSYNC_RETRY_BASE_DELAY_MS", "1000")?;

    let page_size = parse_u32("PIMSYNC_PAGE_SIZE", "250")?;
    if page_size == 0 {
        return Err(invalid("PIMSYNC_PAGE_SIZE", "must be at least 1".to_string()));
    }
    let page_delay_ms = parse_u64("PIMSYNC_PAGE_DELAY_MS", "300")?;
    let item_delay_ms = parse_u64("PIMSYNC_ITEM_DELAY_MS", "200")?;
    let batch_size = parse_usize("PIMSYNC_BATCH_SIZE", "50")?;
    if batch_size == 0 {
        return Err(invalid("PIMSYNC_BATCH_SIZE", "must be at least 1".to_string()));
    }
    let buy_price_mode = parse_as("PIMSYNC_BUY_PRICE_MODE", "bulk_refresh")?
        .parse::<BuyPriceMode>()
        .map_err(|reason| invalid("PIMSYNC_BUY_PRICE_MODE", reason))?;

    let scheduler_enabled = match parse_as("PIMSYNC_SCHEDULER_ENABLED", "true")?
        .trim()
        .to_lowercase()
        .as_str()
    {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        other => {
            return Err(invalid(
                "PIMSYNC_SCHEDULER_ENABLED",
                format!("expected a boolean, got \"{other}\""),
            ))
        }
    };
    let catalog_cron = parse_as("PIMSYNC_CATALOG_CRON", "0 0 3 * * *")?;
    let buy_price_cron = parse_as("PIMSYNC_BUY_PRICE_CRON", "0 30 4 * * *")?;
    let data_cron = parse_as("PIMSYNC_DATA_CRON", "0 15 */6 * * *")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        exclusions_path,
        cron_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        oms_base_url,
        oms_api_key,
        oms_api_secret,
        oms_language,
        oms_country,
        warehouse_base_url,
        warehouse_api_key,
        http_timeout_secs,
        http_user_agent,
        max_retries,
        retry_base_delay_ms,
        page_size,
        page_delay_ms,
        item_delay_ms,
        batch_size,
        buy_price_mode,
        scheduler_enabled,
        catalog_cron,
        buy_price_cron,
        data_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PIMSYNC_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
