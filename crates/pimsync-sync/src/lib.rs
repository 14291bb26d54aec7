//! The reconciliation and sync pipeline.
//!
//! Every job follows the same skeleton: fetch candidates, drop excluded
//! ones, reconcile each against the local catalog, write accepted records
//! in bounded batches, and fold every outcome into a [`SyncResult`].

pub mod error;
pub mod filter;
pub mod history;
pub mod jobs;
pub mod reconcile;
pub mod report;
pub mod settings;
pub mod store;
pub mod writer;

pub use error::SyncError;
pub use filter::ExclusionFilter;
pub use history::run_with_history;
pub use jobs::{
    run_buy_price_sync, run_catalog_sync, run_data_sync, JobKind, SyncContext, Upstreams,
};
pub use reconcile::{ClaimedKeys, Decision, KeyConflict, Reconciler, SkipReason, WritePlan};
pub use report::{SyncPhase, SyncReport, SyncResult, SyncStatus, MAX_SAMPLES};
pub use settings::SyncSettings;
pub use store::{CatalogStore, KeyOwner, PgCatalogStore, StoreError};
pub use writer::BatchWriter;
