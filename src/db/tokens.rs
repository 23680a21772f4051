// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token store: one `linked_accounts` row per account that connected Strava.

use crate::db::{DbResult, SqliteDb};
use crate::models::LinkedAccount;
use crate::time_utils::format_utc_rfc3339;

impl SqliteDb {
    /// Get the stored token triple for an account.
    pub async fn get_linked_account(&self, account_id: i64) -> DbResult<Option<LinkedAccount>> {
        sqlx::query_as::<_, LinkedAccount>(
            "SELECT account_id, access_token, refresh_token, expires_at
             FROM linked_accounts WHERE account_id = ?1",
        )
        .bind(account_id)
        .fetch_optional(self.pool())
        .await
    }

    /// Store the token triple for an account.
    ///
    /// Access token, refresh token and expiry are replaced in one statement,
    /// so readers never observe a mix of old and new values.
    pub async fn set_linked_account(&self, account: &LinkedAccount) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO linked_accounts (account_id, access_token, refresh_token, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(account_id) DO UPDATE SET
               access_token = excluded.access_token,
               refresh_token = excluded.refresh_token,
               expires_at = excluded.expires_at,
               updated_at = excluded.updated_at",
        )
        .bind(account.account_id)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(account.expires_at)
        .bind(format_utc_rfc3339(chrono::Utc::now()))
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
