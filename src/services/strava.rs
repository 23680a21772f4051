// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Authorization code exchange and token refresh
//! - Paginated activity listing
//! - Per-activity detail fetches
//!
//! Every call is made once. Retries belong to the caller (see
//! [`RetryPolicy`](crate::services::retry::RetryPolicy)); timeouts are enforced
//! by the HTTP client and surface as [`ProviderError::Network`].

use crate::config::Config;
use crate::error::ProviderError;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// OAuth scopes requested when linking an account.
pub const STRAVA_SCOPES: &str = "read,activity:read_all";

/// Strava OAuth application credentials.
#[derive(Clone)]
pub struct StravaCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    credentials: StravaCredentials,
}

impl StravaClient {
    /// Create a new Strava client with explicit endpoints and credentials.
    pub fn new(
        api_url: impl Into<String>,
        oauth_url: impl Into<String>,
        credentials: StravaCredentials,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            oauth_url: oauth_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Build a client from application configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Self::new(
            &config.strava_api_url,
            &config.strava_oauth_url,
            StravaCredentials {
                client_id: config.strava_client_id.clone(),
                client_secret: config.strava_client_secret.clone(),
            },
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// URL of the Strava authorization page for the given redirect and state.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&approval_prompt=auto&scope={}&state={}",
            self.oauth_url,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(redirect_uri),
            STRAVA_SCOPES,
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a token triple.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ProviderError> {
        self.post_token(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Refresh an expired access token. Strava may rotate the refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, ProviderError> {
        self.post_token(&[
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// List one page of the athlete's activities. An empty page means no more data.
    pub async fn list_activities(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, ProviderError> {
        let url = format!("{}/athlete/activities", self.api_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("page", page.to_string()), ("per_page", per_page.to_string())])
            .send()
            .await?;

        parse_response(response, Endpoint::Data).await
    }

    /// Get a detailed activity by ID.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: i64,
    ) -> Result<StravaActivity, ProviderError> {
        let url = format!("{}/activities/{}", self.api_url, activity_id);

        let response = self.http.get(&url).bearer_auth(access_token).send().await?;

        parse_response(response, Endpoint::Data).await
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, ProviderError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(form)
            .send()
            .await?;

        parse_response(response, Endpoint::OAuth).await
    }
}

/// Which kind of endpoint produced a response; affects 400 handling.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    OAuth,
    Data,
}

/// Check response status and parse the JSON body.
///
/// The body is read before parsing so that transport failures and contract
/// drift surface as different errors.
async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: Endpoint,
) -> Result<T, ProviderError> {
    let status = response.status();

    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, retry_after, body, endpoint));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn classify_status(
    status: StatusCode,
    retry_after: Option<u64>,
    body: String,
    endpoint: Endpoint,
) -> ProviderError {
    match status.as_u16() {
        429 => {
            tracing::warn!(retry_after = ?retry_after, "Strava rate limit hit (429)");
            ProviderError::RateLimited { retry_after }
        }
        401 | 403 => ProviderError::Auth {
            status: status.as_u16(),
        },
        // Strava answers a bad code or refresh token with 400 invalid_grant.
        400 if endpoint == Endpoint::OAuth => ProviderError::Auth { status: 400 },
        s if status.is_server_error() => ProviderError::Server { status: s },
        s => ProviderError::Rejected { status: s, body },
    }
}

/// Token response from Strava's `/oauth/token` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry (Unix seconds)
    pub expires_at: i64,
    /// Present on code exchange only.
    #[serde(default)]
    pub athlete: Option<StravaAthlete>,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: i64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// Summary activity from `/athlete/activities`.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivitySummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub sport_type: Option<String>,
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub moving_time: i64,
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    pub start_date_local: String,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,
}

impl StravaActivitySummary {
    /// Sport type, preferring the newer `sport_type` over the legacy `type`.
    pub fn kind(&self) -> &str {
        self.sport_type
            .as_deref()
            .or(self.activity_type.as_deref())
            .unwrap_or("Workout")
    }
}

/// Detailed Strava activity from `/activities/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivity {
    pub id: i64,
    #[serde(default)]
    pub max_speed: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub max_watts: Option<f64>,
    #[serde(default)]
    pub kilojoules: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub gear: Option<StravaGear>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub map: Option<StravaMap>,
}

impl StravaActivity {
    /// Get the detailed polyline, falling back to summary if not available.
    pub fn get_polyline(&self) -> Option<&str> {
        let map = self.map.as_ref()?;
        map.polyline
            .as_deref()
            .or(map.summary_polyline.as_deref())
            .filter(|p| !p.is_empty())
    }
}

/// Gear (bike or shoes) attached to an activity.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaGear {
    #[serde(default)]
    pub name: Option<String>,
}

/// Activity map data with polylines.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaMap {
    #[serde(default)]
    pub polyline: Option<String>,
    #[serde(default)]
    pub summary_polyline: Option<String>,
}
