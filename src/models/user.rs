// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User and linked-account models.

use serde::{Deserialize, Serialize};

/// Local user profile. Owned by the registration layer; read here for display fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Local account ID
    pub id: i64,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Email address
    pub email: Option<String>,
}

/// Strava OAuth tokens for a local account.
///
/// The three token fields are always written together, so `expires_at`
/// always describes the stored `access_token`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkedAccount {
    /// Local account ID (owner)
    pub account_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry of `access_token` (Unix seconds)
    pub expires_at: i64,
}

impl LinkedAccount {
    /// Whether the access token must be refreshed at `now` (Unix seconds).
    ///
    /// With a zero margin this is the exact threshold `now >= expires_at`.
    pub fn needs_refresh(&self, now: i64, margin_secs: i64) -> bool {
        now >= self.expires_at.saturating_sub(margin_secs)
    }
}
