//! `sync` command: runs one job in-process, records it in the run history,
//! and prints the result.

use pimsync_core::{AppConfig, BuyPriceMode};
use pimsync_sync::{run_with_history, JobKind, SyncContext, SyncResult, SyncSettings};
use sqlx::PgPool;

use crate::SyncCommands;

/// Job selection plus per-invocation setting overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub job: JobKind,
    pub since_id: Option<i64>,
    pub page_size: Option<u32>,
    pub mode: Option<BuyPriceMode>,
}

impl From<&SyncCommands> for Overrides {
    fn from(command: &SyncCommands) -> Self {
        let base = |job| Self {
            job,
            since_id: None,
            page_size: None,
            mode: None,
        };
        match *command {
            SyncCommands::Catalog {
                since_id,
                page_size,
            } => Self {
                since_id,
                page_size,
                ..base(JobKind::Catalog)
            },
            SyncCommands::BuyPrices { mode } => Self {
                mode,
                ..base(JobKind::BuyPrices)
            },
            SyncCommands::Data => base(JobKind::Data),
        }
    }
}

impl Overrides {
    pub(crate) fn apply(&self, settings: &SyncSettings) -> SyncSettings {
        let mut settings = settings.clone();
        if let Some(since_id) = self.since_id {
            settings.since_id = Some(since_id);
        }
        if let Some(page_size) = self.page_size {
            settings.page_size = page_size.max(1);
        }
        if let Some(mode) = self.mode {
            settings.buy_price_mode = mode;
        }
        settings
    }
}

/// # Errors
///
/// Returns an error if the context cannot be built, the result cannot be
/// printed, or the run did not succeed.
pub(crate) async fn run_sync(
    pool: &PgPool,
    config: &AppConfig,
    overrides: Overrides,
) -> anyhow::Result<()> {
    let ctx = SyncContext::from_config(config, pool.clone())?;
    let settings = overrides.apply(&ctx.settings);
    let job = overrides.job;

    tracing::info!(job = %job, ?settings, "starting sync from cli");
    let result = run_with_history(pool, job, "cli", || ctx.run_with(job, &settings)).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    ensure_success(&result)
}

fn ensure_success(result: &SyncResult) -> anyhow::Result<()> {
    if result.success {
        return Ok(());
    }
    let reason = result.errors.first().map_or("no error recorded", String::as_str);
    anyhow::bail!("{} sync failed: {reason}", result.job)
}
