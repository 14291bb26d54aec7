//! At-most-one run per job kind, shared by the HTTP handlers and the
//! scheduler.

use std::sync::Arc;

use pimsync_sync::JobKind;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct JobLocks {
    catalog: Arc<Mutex<()>>,
    buy_prices: Arc<Mutex<()>>,
    data: Arc<Mutex<()>>,
}

impl JobLocks {
    /// Returns a guard held for the duration of the run, or `None` when the
    /// job is already running.
    pub fn try_acquire(&self, job: JobKind) -> Option<OwnedMutexGuard<()>> {
        let lock = match job {
            JobKind::Catalog => &self.catalog,
            JobKind::BuyPrices => &self.buy_prices,
            JobKind::Data => &self.data,
        };
        Arc::clone(lock).try_lock_owned().ok()
    }
}
