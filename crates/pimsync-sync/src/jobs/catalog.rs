use futures::StreamExt;
use pimsync_upstream::{paginate, CatalogSource, PageOptions};

use crate::filter::ExclusionFilter;
use crate::reconcile::{ClaimedKeys, Reconciler};
use crate::report::{SyncPhase, SyncReport, SyncResult};
use crate::settings::SyncSettings;
use crate::store::CatalogStore;
use crate::writer::BatchWriter;

use super::JobKind;

/// Mirrors the upstream product catalog into the store.
///
/// Pages are fetched in id order starting after `settings.since_id`. Each
/// page is filtered, then enriched, reconciled and written in chunks of
/// `settings.batch_size`. Failing to load the existing business keys or to
/// fetch a page ends the run with `success = false`.
pub async fn run_catalog_sync<S, St>(
    source: &S,
    store: &St,
    filter: &ExclusionFilter,
    settings: &SyncSettings,
) -> SyncResult
where
    S: CatalogSource,
    St: CatalogStore + ?Sized,
{
    let mut report = SyncReport::start(JobKind::Catalog);
    tracing::info!(
        job = %JobKind::Catalog,
        since_id = ?settings.since_id,
        page_size = settings.page_size,
        "catalog sync starting"
    );

    let owners = match store.business_key_owners().await {
        Ok(owners) => owners,
        Err(e) => return report.fatal(format!("failed to load existing business keys: {e}")),
    };
    let known = match store.known_product_ids().await {
        Ok(ids) => ids,
        Err(e) => return report.fatal(format!("failed to load existing products: {e}")),
    };
    let claims = ClaimedKeys::seed(
        owners
            .into_iter()
            .map(|owner| (owner.key, owner.product_external_id)),
    );
    tracing::debug!(keys = claims.len(), products = known.len(), "seeded claimed keys");
    let mut reconciler = Reconciler::new(claims, known);
    let mut writer = BatchWriter::new(store, settings);

    let options = PageOptions::new(settings.page_size)
        .starting_after(settings.since_id)
        .with_page_delay(settings.page_delay)
        .with_max_pages(settings.max_pages);
    let pages = paginate(
        options,
        |since_id, limit| source.fetch_page(since_id, limit),
        |page: &[S::Record]| page.iter().map(S::record_id).max(),
    );
    futures::pin_mut!(pages);

    let mut page_no = 0usize;
    loop {
        report.enter(SyncPhase::Fetching);
        let page = match pages.next().await {
            Some(Ok(page)) => page,
            Some(Err(e)) => return report.fatal(format!("failed to fetch products: {e}")),
            None => break,
        };
        page_no += 1;
        report.record_fetched(page.len());
        tracing::info!(job = %JobKind::Catalog, page = page_no, records = page.len(), "page fetched");

        report.enter(SyncPhase::Filtering);
        let mut candidates = Vec::with_capacity(page.len());
        for record in page {
            if filter.should_exclude(S::record_title(&record)) {
                tracing::debug!(
                    external_id = S::record_id(&record),
                    title = S::record_title(&record),
                    "excluded"
                );
                report.record_excluded();
            } else {
                candidates.push(record);
            }
        }

        let mut candidates = candidates.into_iter().peekable();
        while candidates.peek().is_some() {
            report.enter(SyncPhase::Reconciling);
            let mut decisions = Vec::with_capacity(settings.batch_size);
            for record in candidates.by_ref().take(settings.batch_size.max(1)) {
                report.record_candidate();
                let id = S::record_id(&record);
                let title = S::record_title(&record).to_owned();
                match source.enrich(record).await {
                    Ok(product) => decisions.push(reconciler.reconcile_product(product)),
                    Err(e) => report.record_failure(format!(
                        "product {id} (\"{title}\"): enrichment failed: {e}"
                    )),
                }
            }
            writer.apply_batch(decisions, &mut report).await;
        }
    }

    report.finish()
}
