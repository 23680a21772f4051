// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Strava credentials live here and are handed to [`StravaClient`] explicitly,
//! so tests can point the client at a mock server with fake credentials.
//!
//! [`StravaClient`]: crate::services::strava::StravaClient

use std::env;
use std::str::FromStr;

const DEFAULT_STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";
const MAX_SYNC_PAGE_SIZE: u32 = 200;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Strava ---
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Base URL of the Strava data API
    pub strava_api_url: String,
    /// Base URL of the Strava OAuth endpoints (`/authorize`, `/token`)
    pub strava_oauth_url: String,

    // --- Server ---
    /// Public base URL of this API (used to build the OAuth redirect URI)
    pub api_url: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// SQLite database URL
    pub database_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,

    // --- Sync tuning ---
    /// Timeout applied to every outbound Strava call
    pub http_timeout_secs: u64,
    /// Refresh tokens this many seconds before they expire (0 = exact expiry)
    pub token_refresh_margin_secs: i64,
    /// `per_page` used when walking the activity list
    pub sync_page_size: u32,
    /// Number of detail fetches allowed in flight at once
    pub detail_concurrency: usize,
    /// Attempts per Strava call (1 = no retry)
    pub retry_max_attempts: u32,
    /// First backoff delay, doubled on each retry
    pub retry_base_delay_ms: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_api_url: DEFAULT_STRAVA_API_URL.to_string(),
            strava_oauth_url: DEFAULT_STRAVA_OAUTH_URL.to_string(),
            api_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            database_url: "sqlite::memory:".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            http_timeout_secs: 10,
            token_refresh_margin_secs: 0,
            sync_page_size: 30,
            detail_concurrency: 1,
            retry_max_attempts: 3,
            retry_base_delay_ms: 0,
        }
    }
}

impl Config {
    /// Offline configuration for tests.
    pub fn test_default() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(String::into_bytes)
            .unwrap_or_else(|_| jwt_signing_key.clone());

        let port = parse_or("PORT", 8080)?;

        Ok(Self {
            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            strava_client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            strava_api_url: env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| DEFAULT_STRAVA_API_URL.to_string()),
            strava_oauth_url: env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_STRAVA_OAUTH_URL.to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| format!("http://localhost:{}", port)),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://triforge.db".to_string()),
            port,
            jwt_signing_key,
            oauth_state_key,
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 10)?,
            token_refresh_margin_secs: parse_or::<i64>("TOKEN_REFRESH_MARGIN_SECS", 0)?.max(0),
            sync_page_size: parse_or::<u32>("SYNC_PAGE_SIZE", 30)?.clamp(1, MAX_SYNC_PAGE_SIZE),
            detail_concurrency: parse_or::<usize>("DETAIL_CONCURRENCY", 1)?.max(1),
            retry_max_attempts: parse_or::<u32>("RETRY_MAX_ATTEMPTS", 3)?.max(1),
            retry_base_delay_ms: parse_or("RETRY_BASE_DELAY_MS", 500)?,
        })
    }
}

/// Read an optional numeric variable, rejecting values that do not parse.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
