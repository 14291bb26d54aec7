//! Retry with exponential backoff for upstream requests.
//!
//! Only throttling (HTTP 429) and transient network failures (connect,
//! timeout, send) are retried. Every other error is returned on the first
//! occurrence.

use std::future::Future;
use std::time::Duration;

use crate::error::UpstreamError;

/// How often and how patiently a throttled request is retried.
///
/// The wait before retry `n` (0-based) is `base_delay * 2^n`, so the default
/// policy waits 1s, 2s, 4s, 8s, 16s before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before the retry with 0-based index `retry`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(31))
    }
}

fn is_retriable(err: &UpstreamError) -> bool {
    match err {
        UpstreamError::Throttled { .. } => true,
        UpstreamError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        _ => false,
    }
}

/// Executes `operation` until it succeeds, fails with a non-retriable error,
/// or `policy.max_retries` retries have been spent.
///
/// A throttled request that is still throttled after the last retry is
/// reported as [`UpstreamError::RateLimitExceeded`].
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    service: &str,
    mut operation: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut retry = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retriable(&err) {
            return Err(err);
        }
        if retry >= policy.max_retries {
            return Err(match err {
                UpstreamError::Throttled { .. } => UpstreamError::RateLimitExceeded {
                    service: service.to_owned(),
                    retries: policy.max_retries,
                },
                other => other,
            });
        }

        let delay = policy.delay_for(retry);
        tracing::warn!(
            service,
            retry,
            max_retries = policy.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient upstream error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
