use pimsync_upstream::VariantSource;

use crate::reconcile::{ClaimedKeys, Reconciler};
use crate::report::{SyncPhase, SyncReport, SyncResult};
use crate::settings::SyncSettings;
use crate::store::CatalogStore;
use crate::writer::BatchWriter;

use super::JobKind;

/// Refreshes variant fields and prices for every business key already in
/// the local catalog, looking each one up in the OMS.
pub async fn run_data_sync<V, St>(source: &V, store: &St, settings: &SyncSettings) -> SyncResult
where
    V: VariantSource + ?Sized,
    St: CatalogStore + ?Sized,
{
    let mut report = SyncReport::start(JobKind::Data);
    report.enter(SyncPhase::Fetching);

    let owners = match store.business_key_owners().await {
        Ok(owners) => owners,
        Err(e) => return report.fatal(format!("failed to load existing business keys: {e}")),
    };
    let mut keys: Vec<String> = owners.iter().map(|owner| owner.key.clone()).collect();
    keys.sort_unstable();
    keys.dedup();
    report.record_fetched(keys.len());
    tracing::info!(job = %JobKind::Data, keys = keys.len(), "data sync starting");

    let reconciler = Reconciler::new(
        ClaimedKeys::seed(
            owners
                .into_iter()
                .map(|owner| (owner.key, owner.product_external_id)),
        ),
        [],
    );
    let mut writer = BatchWriter::new(store, settings);

    for chunk in keys.chunks(settings.batch_size.max(1)) {
        report.enter(SyncPhase::Reconciling);
        let mut decisions = Vec::with_capacity(chunk.len());
        for key in chunk {
            report.record_candidate();
            match source.variants_by_business_key(key).await {
                Ok(snapshots) => {
                    if !snapshots.is_empty() {
                        report.record_lookup();
                    }
                    decisions.push(reconciler.reconcile_key(key, snapshots));
                }
                Err(e) => report.record_failure(format!("EAN {key}: lookup failed: {e}")),
            }
        }
        writer.apply_batch(decisions, &mut report).await;
    }

    report.finish()
}
