use std::time::Duration;

use pimsync_core::{AppConfig, BuyPriceMode};
use pimsync_upstream::pagination::MAX_PAGES;

/// Tuning knobs shared by every job.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub page_size: u32,
    pub page_delay: Duration,
    /// Pause between consecutive parent writes.
    pub item_delay: Duration,
    pub batch_size: usize,
    pub max_pages: usize,
    pub buy_price_mode: BuyPriceMode,
    /// Resume the catalog listing after this upstream id.
    pub since_id: Option<i64>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 250,
            page_delay: Duration::from_millis(300),
            item_delay: Duration::from_millis(200),
            batch_size: 50,
            max_pages: MAX_PAGES,
            buy_price_mode: BuyPriceMode::BulkRefresh,
            since_id: None,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.page_size,
            page_delay: Duration::from_millis(config.page_delay_ms),
            item_delay: Duration::from_millis(config.item_delay_ms),
            batch_size: config.batch_size.max(1),
            buy_price_mode: config.buy_price_mode,
            ..Self::default()
        }
    }
}
