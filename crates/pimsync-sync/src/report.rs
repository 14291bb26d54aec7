//! Accumulates the outcome of one job run and renders the final
//! [`SyncResult`].

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::JobKind;
use crate::reconcile::SkipReason;

/// Cap on the error and duplicate sample lists.
pub const MAX_SAMPLES: usize = 20;

/// Run state machine. `Writing` loops back through `Reconciling` once per
/// batch until the candidates are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
    Filtering,
    Reconciling,
    Writing,
    Reporting,
    Done,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Filtering => "filtering",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::Writing => "writing",
            SyncPhase::Reporting => "reporting",
            SyncPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Tri-state derived from `success` and the error count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

/// Immutable summary of one run.
///
/// Invariants for a completed run:
/// - `succeeded + failed + skipped_duplicate + skipped_incomplete == total_candidates`
/// - `total_fetched == total_candidates + excluded`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub job: JobKind,
    pub total_fetched: u64,
    pub excluded: u64,
    pub total_candidates: u64,
    pub successful_lookups: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped_duplicate: u64,
    pub skipped_incomplete: u64,
    pub skip_reasons: BTreeMap<String, u64>,
    /// Uncapped; `errors` holds at most [`MAX_SAMPLES`] of them.
    pub error_count: u64,
    pub errors: Vec<String>,
    pub duplicates: Vec<String>,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration, e.g. `"12.34s"`.
    pub duration: String,
    pub success: bool,
    pub status: SyncStatus,
}

#[derive(Debug)]
pub struct SyncReport {
    job: JobKind,
    started_at: DateTime<Utc>,
    clock: Instant,
    phase: SyncPhase,
    total_fetched: u64,
    excluded: u64,
    total_candidates: u64,
    successful_lookups: u64,
    succeeded: u64,
    failed: u64,
    skipped_duplicate: u64,
    skipped_incomplete: u64,
    skip_reasons: BTreeMap<String, u64>,
    error_count: u64,
    errors: Vec<String>,
    duplicates: Vec<String>,
}

impl SyncReport {
    #[must_use]
    pub fn start(job: JobKind) -> Self {
        Self {
            job,
            started_at: Utc::now(),
            clock: Instant::now(),
            phase: SyncPhase::Idle,
            total_fetched: 0,
            excluded: 0,
            total_candidates: 0,
            successful_lookups: 0,
            succeeded: 0,
            failed: 0,
            skipped_duplicate: 0,
            skipped_incomplete: 0,
            skip_reasons: BTreeMap::new(),
            error_count: 0,
            errors: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    #[must_use]
    pub fn job(&self) -> JobKind {
        self.job
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn enter(&mut self, phase: SyncPhase) {
        if self.phase != phase {
            tracing::debug!(job = %self.job, from = %self.phase, to = %phase, "phase transition");
            self.phase = phase;
        }
    }

    pub fn record_fetched(&mut self, count: usize) {
        self.total_fetched += count as u64;
    }

    pub fn record_excluded(&mut self) {
        self.excluded += 1;
    }

    pub fn record_candidate(&mut self) {
        self.total_candidates += 1;
    }

    pub fn record_lookup(&mut self) {
        self.successful_lookups += 1;
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    /// Counts a failed candidate and samples its error.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.record_error(message);
    }

    /// Counts a failed candidate whose error was already sampled.
    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    /// Samples an error without changing candidate counters.
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(job = %self.job, error = %message, "sync error");
        self.error_count += 1;
        if self.errors.len() < MAX_SAMPLES {
            self.errors.push(message);
        }
    }

    /// Counts a candidate skipped because of a business-key conflict.
    pub fn record_duplicate(&mut self, samples: Vec<String>, reason: SkipReason) {
        self.skipped_duplicate += 1;
        self.note_skip(reason);
        for sample in samples {
            self.record_duplicate_sample(sample);
        }
    }

    pub fn record_duplicate_sample(&mut self, sample: impl Into<String>) {
        let sample = sample.into();
        tracing::warn!(job = %self.job, duplicate = %sample, "business key conflict");
        if self.duplicates.len() < MAX_SAMPLES {
            self.duplicates.push(sample);
        }
    }

    /// Counts a candidate skipped for missing data.
    pub fn record_incomplete(&mut self, reason: SkipReason) {
        self.skipped_incomplete += 1;
        self.note_skip(reason);
    }

    /// Counts a skip reason for a dependent write (e.g. one price row)
    /// without classifying the candidate itself.
    pub fn note_skip(&mut self, reason: SkipReason) {
        *self
            .skip_reasons
            .entry(reason.as_str().to_owned())
            .or_insert(0) += 1;
    }

    /// Ends the run early: `pending` candidates that were decided but never
    /// written are counted as failed and `message` becomes the run's error.
    #[must_use]
    pub fn abort(mut self, pending: usize, message: impl Into<String>) -> SyncResult {
        self.failed += pending as u64;
        self.fatal(message)
    }

    /// Ends the run with a top-level error; the result is never successful.
    #[must_use]
    pub fn fatal(mut self, message: impl Into<String>) -> SyncResult {
        let message = message.into();
        tracing::error!(job = %self.job, error = %message, "sync aborted");
        self.error_count += 1;
        if self.errors.len() < MAX_SAMPLES {
            self.errors.push(message);
        }
        self.into_result(false)
    }

    #[must_use]
    pub fn finish(self) -> SyncResult {
        let success = self.error_count == 0 || self.succeeded > 0;
        self.into_result(success)
    }

    fn into_result(mut self, success: bool) -> SyncResult {
        self.enter(SyncPhase::Reporting);
        let duration = format!("{:.2}s", self.clock.elapsed().as_secs_f64());
        let status = if !success {
            SyncStatus::Failed
        } else if self.error_count == 0 {
            SyncStatus::Success
        } else {
            SyncStatus::Partial
        };
        self.enter(SyncPhase::Done);

        tracing::info!(
            job = %self.job,
            fetched = self.total_fetched,
            excluded = self.excluded,
            candidates = self.total_candidates,
            succeeded = self.succeeded,
            failed = self.failed,
            skipped_duplicate = self.skipped_duplicate,
            skipped_incomplete = self.skipped_incomplete,
            errors = self.error_count,
            duration = %duration,
            ?status,
            "sync finished"
        );

        SyncResult {
            job: self.job,
            total_fetched: self.total_fetched,
            excluded: self.excluded,
            total_candidates: self.total_candidates,
            successful_lookups: self.successful_lookups,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped_duplicate: self.skipped_duplicate,
            skipped_incomplete: self.skipped_incomplete,
            skip_reasons: self.skip_reasons,
            error_count: self.error_count,
            errors: self.errors,
            duplicates: self.duplicates,
            started_at: self.started_at,
            duration,
            success,
            status,
        }
    }
}
