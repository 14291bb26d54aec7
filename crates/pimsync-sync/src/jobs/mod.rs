//! The three sync jobs and the context that wires them to live upstreams
//! and the database.

mod buy_prices;
mod catalog;
mod data;

use std::sync::Arc;
use std::time::Duration;

use pimsync_core::{load_exclusions_or_empty, AppConfig};
use pimsync_upstream::{
    ApiClient, ClientOptions, Credentials, OmsClient, RetryPolicy, UpstreamError, WarehouseClient,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::SyncError;
use crate::filter::ExclusionFilter;
use crate::report::{SyncReport, SyncResult};
use crate::settings::SyncSettings;
use crate::store::{CatalogStore, PgCatalogStore};

pub use buy_prices::run_buy_price_sync;
pub use catalog::run_catalog_sync;
pub use data::run_data_sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Full product catalog from the OMS.
    Catalog,
    /// Cost prices from the warehouse.
    BuyPrices,
    /// Variant fields and prices for keys already in the catalog.
    Data,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Catalog, JobKind::BuyPrices, JobKind::Data];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Catalog => "catalog",
            JobKind::BuyPrices => "buy_prices",
            JobKind::Data => "data",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catalog" => Ok(JobKind::Catalog),
            "buy_prices" | "buy-prices" => Ok(JobKind::BuyPrices),
            "data" => Ok(JobKind::Data),
            other => Err(format!(
                "unknown job \"{other}\" (expected catalog, buy_prices or data)"
            )),
        }
    }
}

/// Live upstream clients. A client is only built when its credentials are
/// configured.
#[derive(Debug, Clone, Default)]
pub struct Upstreams {
    pub oms: Option<OmsClient>,
    pub warehouse: Option<WarehouseClient>,
}

impl Upstreams {
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if a configured base URL or credential is
    /// unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let options = ClientOptions::new(config.http_timeout_secs, &config.http_user_agent)
            .with_retry(RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ));

        let oms = match &config.oms_api_key {
            Some(key) => {
                let secret = config.oms_api_secret.clone().unwrap_or_default();
                let api = ApiClient::new(
                    "oms",
                    &config.oms_base_url,
                    &Credentials::new(key.clone(), secret),
                    options.clone(),
                )?;
                Some(OmsClient::new(api, &config.oms_language, &config.oms_country))
            }
            None => None,
        };

        let warehouse = match &config.warehouse_api_key {
            Some(key) => {
                let api = ApiClient::new(
                    "warehouse",
                    &config.warehouse_base_url,
                    &Credentials::key_only(key.clone()),
                    options,
                )?;
                Some(WarehouseClient::new(api))
            }
            None => None,
        };

        Ok(Self { oms, warehouse })
    }
}

/// Everything a job needs, shared by the server and the CLI.
#[derive(Clone)]
pub struct SyncContext {
    pub upstreams: Upstreams,
    pub store: Arc<dyn CatalogStore>,
    pub filter: ExclusionFilter,
    pub settings: SyncSettings,
}

impl SyncContext {
    /// Builds the live context: upstream clients from credentials, the
    /// Postgres store, and the exclusion denylist (empty when the file is
    /// absent).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the denylist is malformed or an upstream
    /// client cannot be built.
    pub fn from_config(config: &AppConfig, pool: PgPool) -> Result<Self, SyncError> {
        if !config.exclusions_path.exists() {
            tracing::warn!(
                path = %config.exclusions_path.display(),
                "exclusions file not found; nothing will be excluded"
            );
        }
        let exclusions = load_exclusions_or_empty(&config.exclusions_path)?;
        let filter = ExclusionFilter::from_file(&exclusions);
        tracing::info!(entries = filter.len(), "exclusion filter loaded");

        Ok(Self {
            upstreams: Upstreams::from_config(config)?,
            store: Arc::new(PgCatalogStore::new(pool)),
            filter,
            settings: SyncSettings::from_app_config(config),
        })
    }

    pub async fn run(&self, job: JobKind) -> SyncResult {
        self.run_with(job, &self.settings).await
    }

    /// Runs `job` with per-invocation settings (e.g. a CLI override).
    pub async fn run_with(&self, job: JobKind, settings: &SyncSettings) -> SyncResult {
        let store = self.store.as_ref();
        match job {
            JobKind::Catalog => match &self.upstreams.oms {
                Some(oms) => run_catalog_sync(oms, store, &self.filter, settings).await,
                None => missing_client(job, "OMS credentials are not configured"),
            },
            JobKind::BuyPrices => match &self.upstreams.warehouse {
                Some(warehouse) => run_buy_price_sync(warehouse, store, settings).await,
                None => missing_client(job, "warehouse credentials are not configured"),
            },
            JobKind::Data => match &self.upstreams.oms {
                Some(oms) => run_data_sync(oms, store, settings).await,
                None => missing_client(job, "OMS credentials are not configured"),
            },
        }
    }
}

fn missing_client(job: JobKind, reason: &str) -> SyncResult {
    SyncReport::start(job).fatal(SyncError::Setup(reason.to_owned()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_round_trips_through_str() {
        for job in JobKind::ALL {
            assert_eq!(job.as_str().parse::<JobKind>().unwrap(), job);
        }
        assert_eq!("buy-prices".parse::<JobKind>().unwrap(), JobKind::BuyPrices);
        assert!("prices".parse::<JobKind>().is_err());
    }

    #[test]
    fn job_without_credentials_fails_fast() {
        let result = missing_client(JobKind::BuyPrices, "warehouse credentials are not configured");
        assert!(!result.success);
        assert_eq!(result.total_candidates, 0);
        assert_eq!(
            result.errors,
            vec!["setup failed: warehouse credentials are not configured"]
        );
    }
}
