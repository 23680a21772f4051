// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth linking routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::time_utils::now_unix;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed `state` value stays valid.
const STATE_MAX_AGE_SECS: i64 = 10 * 60;

/// Routes that need a session (the account being linked comes from the JWT).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/strava/auth", get(auth_start))
}

/// Routes Strava redirects the browser to.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/strava/callback", get(auth_callback))
}

/// Start OAuth flow - redirect to Strava authorization.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Redirect> {
    let oauth_state = sign_state(user.account_id, now_unix(), &state.config.oauth_state_key)?;
    let callback_url = format!("{}/api/strava/callback", state.config.api_url);
    let auth_url = state.strava.authorize_url(&callback_url, &oauth_state);

    tracing::info!(
        account_id = user.account_id,
        client_id = %state.config.strava_client_id,
        "Starting OAuth flow, redirecting to Strava"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub success: bool,
    pub message: String,
    pub account_id: i64,
}

/// OAuth callback - exchange code for tokens, then start the initial sync.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<LinkResponse>> {
    // Check for OAuth errors
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return Err(AppError::BadRequest(format!("Strava authorization failed: {}", error)));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Authorization code is missing.".to_string()))?;

    let account_id = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, now_unix()))
        .ok_or_else(|| {
            tracing::warn!("Invalid, expired or tampered OAuth state parameter");
            AppError::BadRequest("Invalid or expired state parameter.".to_string())
        })?;

    tracing::info!(account_id, "Exchanging authorization code for tokens");
    state.token_manager.link_account(account_id, &code).await?;

    spawn_initial_sync(&state, account_id);

    Ok(Json(LinkResponse {
        success: true,
        message: "Strava account linked. Activity sync started.".to_string(),
        account_id,
    }))
}

/// Run the first sync pass in the background. Failures are only logged.
fn spawn_initial_sync(state: &Arc<AppState>, account_id: i64) {
    let reconciler = state.reconciler.clone();
    let cancel = state.shutdown.child_token();

    tokio::spawn(async move {
        match reconciler.sync_account(account_id, &cancel).await {
            Ok(summary) => tracing::info!(
                account_id,
                synced = summary.synced_count,
                "Initial sync finished"
            ),
            Err(e) => tracing::warn!(account_id, error = %e, "Initial sync failed"),
        }
    });
}

fn compute_signature(payload: &str, secret: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Build the signed `state` value: base64("account_id|issued_at_hex|signature_hex").
fn sign_state(account_id: i64, issued_at: i64, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", account_id, issued_at);
    let signature = compute_signature(&payload, secret)?;
    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and age of a `state` value and return its account ID.
fn verify_state(state: &str, secret: &[u8], now: i64) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let mut parts = state_str.splitn(3, '|');
    let account_part = parts.next()?;
    let issued_hex = parts.next()?;
    let signature_hex = parts.next()?;

    let payload = format!("{}|{}", account_part, issued_hex);
    let expected = compute_signature(&payload, secret).ok()?;
    let provided = hex::decode(signature_hex).ok()?;

    if !bool::from(provided.as_slice().ct_eq(expected.as_slice())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = i64::from_str_radix(issued_hex, 16).ok()?;
    let age = now - issued_at;
    if !(0..=STATE_MAX_AGE_SECS).contains(&age) {
        tracing::warn!(age, "OAuth state expired");
        return None;
    }

    account_part.parse().ok()
}
