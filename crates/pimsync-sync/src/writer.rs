//! Applies reconciled decisions to the store in bounded batches.
//!
//! One batch is written at a time. A failed write is recorded against its
//! candidate and never aborts the batch.

use std::time::Duration;

use crate::reconcile::{Decision, ProductPlan, SkipReason, WritePlan};
use crate::report::{SyncPhase, SyncReport};
use crate::settings::SyncSettings;
use crate::store::CatalogStore;

pub struct BatchWriter<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    batch_size: usize,
    item_delay: Duration,
    wrote_any: bool,
}

impl<'a, S: CatalogStore + ?Sized> BatchWriter<'a, S> {
    pub fn new(store: &'a S, settings: &SyncSettings) -> Self {
        Self {
            store,
            batch_size: settings.batch_size.max(1),
            item_delay: settings.item_delay,
            wrote_any: false,
        }
    }

    /// Splits `decisions` into batches and applies them in order.
    pub async fn apply_all(&mut self, decisions: Vec<Decision>, report: &mut SyncReport) {
        let mut decisions = decisions.into_iter().peekable();
        let mut batch_no = 0usize;
        while decisions.peek().is_some() {
            batch_no += 1;
            let batch: Vec<Decision> = decisions.by_ref().take(self.batch_size).collect();
            tracing::debug!(job = %report.job(), batch = batch_no, size = batch.len(), "writing batch");
            self.apply_batch(batch, report).await;
        }
    }

    /// Settles skips and writes every accepted record of one batch.
    pub async fn apply_batch(&mut self, batch: Vec<Decision>, report: &mut SyncReport) {
        report.enter(SyncPhase::Writing);
        for decision in batch {
            match decision {
                Decision::Create(plan) | Decision::Update(plan) => {
                    self.pace().await;
                    self.write(plan, report).await;
                }
                skip => settle_skip(skip, report),
            }
        }
    }

    async fn pace(&mut self) {
        if self.wrote_any && !self.item_delay.is_zero() {
            tokio::time::sleep(self.item_delay).await;
        }
        self.wrote_any = true;
    }

    async fn write(&self, plan: WritePlan, report: &mut SyncReport) {
        let label = plan.label();
        match plan {
            WritePlan::Product(plan) => self.write_product(&label, plan, report).await,
            WritePlan::Variant { key, variant } => {
                match self.store.update_variant(&key, &variant).await {
                    Ok(true) => {}
                    Ok(false) => {
                        report.record_failure(format!("{label}: no local variant carries this key"));
                        return;
                    }
                    Err(e) => {
                        report.record_failure(format!("{label}: variant update failed: {e}"));
                        return;
                    }
                }
                match self.store.replace_prices(&key, &variant.prices).await {
                    Ok(()) => report.record_success(),
                    Err(e) => report.record_failure(format!("{label}: price write failed: {e}")),
                }
            }
            WritePlan::BuyPrice {
                key,
                cost_price,
                warehouse_product_id,
            } => match self
                .store
                .upsert_buy_price(&key, cost_price, warehouse_product_id)
                .await
            {
                Ok(()) => report.record_success(),
                Err(e) => report.record_failure(format!("{label}: buy price write failed: {e}")),
            },
        }
    }

    async fn write_product(&self, label: &str, plan: ProductPlan, report: &mut SyncReport) {
        for _ in 0..plan.unkeyed_priced_variants() {
            report.note_skip(SkipReason::PriceMissingBusinessKey);
        }
        for conflict in &plan.conflicts {
            report.note_skip(SkipReason::VariantDuplicateKey);
            report.record_duplicate_sample(conflict.to_string());
        }

        let product = plan.product;
        let product_id = match self.store.upsert_product(&product).await {
            Ok(id) => id,
            Err(e) => {
                report.record_failure(format!("{label}: upsert failed: {e}"));
                return;
            }
        };

        if let Err(e) = self.store.replace_children(product_id, &product).await {
            report.record_failure(format!("{label}: child write failed: {e}"));
            return;
        }

        let mut price_errors = 0usize;
        for variant in &product.variants {
            let Some(key) = variant.business_key() else {
                continue;
            };
            if let Err(e) = self.store.replace_prices(key, &variant.prices).await {
                price_errors += 1;
                report.record_error(format!("{label}: prices for EAN {key} failed: {e}"));
            }
        }

        if price_errors == 0 {
            report.record_success();
        } else {
            report.record_failed();
        }
    }
}

fn settle_skip(decision: Decision, report: &mut SyncReport) {
    match decision {
        Decision::SkipDuplicate { samples, reason } => report.record_duplicate(samples, reason),
        Decision::SkipIncomplete { reason } => report.record_incomplete(reason),
        Decision::Create(_) | Decision::Update(_) => {}
    }
}

/// Records a skip decision immediately; write decisions are returned for
/// later application.
pub(crate) fn settle_or_defer(decision: Decision, report: &mut SyncReport) -> Option<Decision> {
    if decision.is_write() {
        Some(decision)
    } else {
        settle_skip(decision, report);
        None
    }
}
