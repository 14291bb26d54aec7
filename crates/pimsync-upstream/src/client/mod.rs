//! Authenticated JSON client shared by every upstream integration.

mod link;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::auth::Credentials;
use crate::error::UpstreamError;
use crate::quota::{Pacing, QuotaState};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Longest error body kept in [`UpstreamError::UnexpectedStatus`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Transport settings for an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
}

impl ClientOptions {
    #[must_use]
    pub fn new(timeout_secs: u64, user_agent: &str) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            user_agent: user_agent.to_owned(),
            retry: RetryPolicy::default(),
            pacing: Pacing::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}

/// Rate-limit-aware JSON client for one upstream service.
///
/// Every request:
/// 1. waits a pre-request delay chosen from the last observed quota,
/// 2. sends an authenticated `GET`,
/// 3. records any quota headers on the response,
/// 4. retries HTTP 429 and network failures with exponential backoff.
///
/// Clones share the quota observation, so pacing stays coherent when several
/// tasks use the same upstream.
#[derive(Clone)]
pub struct ApiClient {
    service: Arc<str>,
    client: Client,
    base_url: Url,
    authorization: HeaderValue,
    retry: RetryPolicy,
    pacing: Pacing,
    quota: Arc<Mutex<QuotaState>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client for `service` rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::InvalidBaseUrl`] if `base_url` is not an absolute
    ///   `http(s)` URL.
    /// - [`UpstreamError::InvalidCredentials`] if the credentials cannot be
    ///   rendered as a header value.
    /// - [`UpstreamError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        service: &str,
        base_url: &str,
        credentials: &Credentials,
        options: ClientOptions,
    ) -> Result<Self, UpstreamError> {
        let base_url = link::parse_base_url(base_url)?;
        let mut authorization = HeaderValue::from_str(&credentials.basic_header())
            .map_err(|e| UpstreamError::InvalidCredentials(e.to_string()))?;
        authorization.set_sensitive(true);

        let client = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(Self {
            service: Arc::from(service),
            client,
            base_url,
            authorization,
            retry: options.retry,
            pacing: options.pacing,
            quota: Arc::new(Mutex::new(QuotaState::default())),
        })
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The most recent quota observation.
    pub async fn quota(&self) -> QuotaState {
        *self.quota.lock().await
    }

    /// Resolves `endpoint` (a path relative to the base URL, or an absolute
    /// link on the same origin) and appends `query`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::MalformedResponse`] when `endpoint` cannot be
    /// joined or points at a different origin.
    pub fn endpoint_url(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Url, UpstreamError> {
        link::resolve(&self.base_url, &self.service, endpoint, query)
    }

    /// Sends an authenticated `GET` and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::RateLimitExceeded`]: still throttled after all retries.
    /// - [`UpstreamError::UnexpectedStatus`]: any other non-2xx (not retried).
    /// - [`UpstreamError::Http`]: network failure after all retries.
    /// - [`UpstreamError::Deserialize`]: the body is not JSON.
    pub async fn request(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, UpstreamError> {
        let url = self.endpoint_url(endpoint, query)?;
        let url = &url;
        retry_with_backoff(self.retry, &self.service, || self.send_once(url)).await
    }

    /// Like [`ApiClient::request`], deserializing into `T`.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::request`], plus [`UpstreamError::Deserialize`] when the
    /// JSON does not match `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let value = self.request(endpoint, query).await?;
        serde_json::from_value(value).map_err(|e| UpstreamError::Deserialize {
            context: format!("{} {endpoint}", self.service),
            source: e,
        })
    }

    async fn send_once(&self, url: &Url) -> Result<serde_json::Value, UpstreamError> {
        let delay = {
            let quota = self.quota.lock().await;
            self.pacing.delay_for(&quota)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if let Some(observed) = QuotaState::from_headers(response.headers()) {
            tracing::debug!(
                service = %self.service,
                limit = ?observed.limit,
                remaining = ?observed.remaining,
                "quota observed"
            );
            *self.quota.lock().await = observed;
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::Throttled {
                service: self.service.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
            context: format!("{} {}", self.service, url.path()),
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
