// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Result of a sync pass.

use serde::Serialize;

/// Outcome of one successful sync pass for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub account_id: i64,
    /// Activities whose summary row was written
    pub synced_count: u32,
    /// Activities written without a detail row (detail fetch or write failed)
    pub partial_count: u32,
    /// Activities that could not be written at all
    pub failed_count: u32,
    /// List pages requested, including the final empty page
    pub pages_fetched: u32,
}
