use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,

    /// A sync run was moved out of order, e.g. completed while still queued.
    #[error("sync run {id} is not in expected status \"{expected_status}\"")]
    InvalidSyncRunTransition {
        id: i64,
        expected_status: &'static str,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}
