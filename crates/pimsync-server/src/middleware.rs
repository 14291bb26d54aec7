use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use pimsync_core::{AppConfig, Environment};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// `CRON_SECRET` bearer auth for job and history endpoints.
#[derive(Clone)]
pub struct CronAuth {
    secret: Option<Arc<str>>,
}

impl std::fmt::Debug for CronAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronAuth")
            .field("enabled", &self.enabled())
            .finish()
    }
}

impl CronAuth {
    /// In development a missing secret disables auth; anywhere else it
    /// fails startup.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(
            config.cron_secret.as_deref(),
            config.env == Environment::Development,
        )
    }

    pub fn new(secret: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        match secret.map(str::trim).filter(|s| !s.is_empty()) {
            Some(secret) => Ok(Self {
                secret: Some(Arc::from(secret)),
            }),
            None if is_development => {
                tracing::warn!("CRON_SECRET not set; job endpoints are open in development");
                Ok(Self { secret: None })
            }
            None => anyhow::bail!("CRON_SECRET is required outside development"),
        }
    }

    pub fn enabled(&self) -> bool {
        self.secret.is_some()
    }

    fn allows(&self, token: &str) -> bool {
        match &self.secret {
            Some(secret) => token.as_bytes().ct_eq(secret.as_bytes()).into(),
            None => true,
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// An incoming `x-request-id` header is reused; otherwise a new `UUIDv4` is
/// generated. The ID is stored as a [`RequestId`] extension and echoed on
/// the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Rejects requests without `Authorization: Bearer <CRON_SECRET>` when a
/// secret is configured.
pub async fn require_cron_secret(
    State(auth): State<CronAuth>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled() {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "unauthorized",
                    message: "missing or invalid bearer token",
                },
            }),
        )
            .into_response(),
    }
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
