use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A single HTTP 429. Consumed by the retry loop; callers of
    /// [`crate::ApiClient`] only ever see [`UpstreamError::RateLimitExceeded`].
    #[error("throttled by {service} (HTTP 429)")]
    Throttled { service: String },

    #[error("rate limit exceeded for {service} after {retries} retries")]
    RateLimitExceeded { service: String, retries: u32 },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed response for {context}: {reason}")]
    MalformedResponse { context: String, reason: String },

    #[error("pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}
