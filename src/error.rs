// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the provider client, the sync engine and the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failure of a single call to the Strava API.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport failure, including timeouts.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Strava rejected credentials (HTTP {status})")]
    Auth { status: u16 },

    /// HTTP 429. `retry_after` is the provider-specified delay in seconds.
    #[error("Strava rate limit hit")]
    RateLimited { retry_after: Option<u64> },

    #[error("Strava server error (HTTP {status})")]
    Server { status: u16 },

    /// Any other non-success status on a data endpoint.
    #[error("Strava rejected request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed Strava response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::Server { .. }
        )
    }

    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::Auth { .. } => "auth",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Server { .. } => "server",
            ProviderError::Rejected { .. } => "rejected",
            ProviderError::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Network(format!("request timed out: {}", err))
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Terminal failure of a token lookup or a sync pass.
///
/// A failed token refresh surfaces as either [`SyncError::ProviderAuth`] or
/// [`SyncError::Provider`]; callers must treat both as "no usable token". Only
/// `ProviderAuth` means the user has to relink. Stored tokens are unchanged
/// in both cases.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No Strava account linked for account {0}")]
    AccountNotLinked(i64),

    /// Strava refused the stored credentials; the account must be relinked.
    #[error("Strava token refresh rejected: {0}")]
    ProviderAuth(#[source] ProviderError),

    /// Transport, rate-limit, server or contract failure. Retrying later may succeed,
    /// except for `Malformed` and `Auth`.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("A sync is already running for account {0}")]
    SyncInProgress(i64),

    #[error("Sync cancelled")]
    Cancelled,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Sync(err) => sync_error_parts(err),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Map a sync failure to one status and error code. Transport details stay in the logs.
fn sync_error_parts(err: &SyncError) -> (StatusCode, &'static str, Option<String>) {
    match err {
        SyncError::AccountNotLinked(_) => (
            StatusCode::CONFLICT,
            "account_not_linked",
            Some("Connect a Strava account first".to_string()),
        ),
        SyncError::ProviderAuth(_) | SyncError::Provider(ProviderError::Auth { .. }) => (
            StatusCode::UNAUTHORIZED,
            "provider_auth_error",
            Some("Strava authorization expired, please reconnect".to_string()),
        ),
        SyncError::Provider(ProviderError::RateLimited { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "provider_rate_limited",
            None,
        ),
        SyncError::Provider(ProviderError::Malformed(msg)) => {
            tracing::error!(error = %msg, "Malformed Strava response");
            (StatusCode::BAD_GATEWAY, "provider_malformed_response", None)
        }
        SyncError::Provider(e) => {
            tracing::warn!(error = %e, kind = e.kind(), "Strava request failed");
            (StatusCode::BAD_GATEWAY, "provider_error", None)
        }
        SyncError::Persistence(e) => {
            tracing::error!(error = %e, "Database error during sync");
            (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
        }
        SyncError::SyncInProgress(_) => (StatusCode::CONFLICT, "sync_in_progress", None),
        SyncError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "sync_cancelled", None),
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
