use pimsync_core::BuyPriceMode;
use pimsync_upstream::{BuyPriceSource, CostPriceLookup};

use crate::reconcile::reconcile_buy_price;
use crate::report::{SyncPhase, SyncReport, SyncResult};
use crate::settings::SyncSettings;
use crate::store::CatalogStore;
use crate::writer::{settle_or_defer, BatchWriter};

use super::JobKind;

/// Looks up the warehouse cost price of every local business key.
///
/// In [`BuyPriceMode::BulkRefresh`] the table is cleared once every lookup
/// has run and none of them failed, then repopulated; when some lookups
/// failed the found prices are upserted and stale rows are kept. In
/// [`BuyPriceMode::InPlace`] each chunk is written as soon as it is looked
/// up and nothing is deleted.
pub async fn run_buy_price_sync<B, St>(source: &B, store: &St, settings: &SyncSettings) -> SyncResult
where
    B: BuyPriceSource + ?Sized,
    St: CatalogStore + ?Sized,
{
    let mut report = SyncReport::start(JobKind::BuyPrices);
    report.enter(SyncPhase::Fetching);

    let mut keys: Vec<String> = match store.business_key_owners().await {
        Ok(owners) => owners.into_iter().map(|owner| owner.key).collect(),
        Err(e) => return report.fatal(format!("failed to load existing business keys: {e}")),
    };
    keys.sort_unstable();
    keys.dedup();
    report.record_fetched(keys.len());
    tracing::info!(
        job = %JobKind::BuyPrices,
        keys = keys.len(),
        mode = %settings.buy_price_mode,
        "buy price sync starting"
    );

    let mut writer = BatchWriter::new(store, settings);
    let mut pending = Vec::new();
    let mut lookup_failures = 0usize;

    for chunk in keys.chunks(settings.batch_size.max(1)) {
        report.enter(SyncPhase::Reconciling);
        let mut decisions = Vec::with_capacity(chunk.len());
        for key in chunk {
            report.record_candidate();
            match source.lookup_cost_price(key).await {
                Ok(lookup) => {
                    if matches!(lookup, CostPriceLookup::Found { .. }) {
                        report.record_lookup();
                    }
                    decisions.push(reconcile_buy_price(key, lookup));
                }
                Err(e) => {
                    lookup_failures += 1;
                    report.record_failure(format!("EAN {key}: lookup failed: {e}"));
                }
            }
        }

        match settings.buy_price_mode {
            BuyPriceMode::InPlace => writer.apply_batch(decisions, &mut report).await,
            BuyPriceMode::BulkRefresh => pending.extend(
                decisions
                    .into_iter()
                    .filter_map(|decision| settle_or_defer(decision, &mut report)),
            ),
        }
    }

    if settings.buy_price_mode == BuyPriceMode::BulkRefresh {
        report.enter(SyncPhase::Writing);
        if lookup_failures > 0 {
            tracing::warn!(
                failures = lookup_failures,
                found = pending.len(),
                "lookups failed; upserting found prices without clearing the table"
            );
        } else {
            match store.clear_buy_prices().await {
                Ok(removed) => tracing::info!(removed, "cleared buy prices"),
                Err(e) => {
                    return report
                        .abort(pending.len(), format!("failed to clear buy prices: {e}"))
                }
            }
        }
        writer.apply_all(pending, &mut report).await;
    }

    report.finish()
}
