// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token lifecycle for linked Strava accounts.

use crate::db::SqliteDb;
use crate::error::{ProviderError, SyncError};
use crate::models::LinkedAccount;
use crate::services::strava::StravaClient;
use crate::time_utils::now_unix;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared refresh locks, one per account.
pub type RefreshLocks = Arc<DashMap<i64, Arc<Mutex<()>>>>;

/// Hands out valid Strava access tokens, refreshing them when they expire.
///
/// This service encapsulates:
/// - Token lookup in the `linked_accounts` table
/// - Refresh against Strava when `now >= expires_at - margin`
/// - Persisting the rotated token triple
/// - Per-account locking so one refresh token is never spent twice
#[derive(Clone)]
pub struct TokenManager {
    client: StravaClient,
    db: SqliteDb,
    /// Refresh this many seconds before expiry (0 = exact expiry).
    refresh_margin_secs: i64,
    refresh_locks: RefreshLocks,
}

impl TokenManager {
    pub fn new(client: StravaClient, db: SqliteDb, refresh_margin_secs: i64) -> Self {
        Self {
            client,
            db,
            refresh_margin_secs: refresh_margin_secs.max(0),
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Get a valid (non-expired) access token for the given account.
    ///
    /// A still-valid stored token is returned without any network call. An
    /// expired one is refreshed and the new triple persisted before returning.
    /// A failed refresh leaves the stored triple untouched.
    pub async fn get_valid_access_token(&self, account_id: i64) -> Result<String, SyncError> {
        let account = self.load(account_id).await?;
        if !account.needs_refresh(now_unix(), self.refresh_margin_secs) {
            return Ok(account.access_token);
        }

        let lock = self
            .refresh_locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let account = self.load(account_id).await?;
        if !account.needs_refresh(now_unix(), self.refresh_margin_secs) {
            return Ok(account.access_token);
        }

        tracing::info!(account_id, expires_at = account.expires_at, "Access token expired, refreshing");

        let tokens = self
            .client
            .refresh_token(&account.refresh_token)
            .await
            .map_err(|e| refresh_failure(account_id, e))?;

        let refreshed = LinkedAccount {
            account_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
        };
        self.db.set_linked_account(&refreshed).await?;

        tracing::info!(account_id, expires_at = refreshed.expires_at, "Token refreshed and stored");
        Ok(refreshed.access_token)
    }

    /// Handle the OAuth callback: exchange `code` and store the token triple.
    pub async fn link_account(&self, account_id: i64, code: &str) -> Result<LinkedAccount, SyncError> {
        let tokens = self.client.exchange_code(code).await.map_err(|e| match e {
            ProviderError::Auth { .. } => SyncError::ProviderAuth(e),
            other => SyncError::Provider(other),
        })?;

        let account = LinkedAccount {
            account_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
        };
        self.db.set_linked_account(&account).await?;

        tracing::info!(
            account_id,
            strava_athlete_id = tokens.athlete.as_ref().map(|a| a.id),
            "Strava account linked"
        );
        Ok(account)
    }

    async fn load(&self, account_id: i64) -> Result<LinkedAccount, SyncError> {
        self.db
            .get_linked_account(account_id)
            .await?
            .ok_or(SyncError::AccountNotLinked(account_id))
    }
}

/// A rejected refresh needs a relink; transport trouble and contract drift do not.
fn refresh_failure(account_id: i64, err: ProviderError) -> SyncError {
    match err {
        ProviderError::Auth { .. } | ProviderError::Rejected { .. } => {
            tracing::warn!(account_id, error = %err, kind = err.kind(), "Strava refused token refresh");
            SyncError::ProviderAuth(err)
        }
        other => {
            tracing::warn!(account_id, error = %other, kind = other.kind(), "Token refresh failed");
            SyncError::Provider(other)
        }
    }
}
