use pimsync_core::ConfigError;
use pimsync_upstream::UpstreamError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A job cannot start: missing credentials or an unusable dependency.
    #[error("setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
