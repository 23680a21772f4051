// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod sync;
pub mod user;

pub use activity::{ActivityDetail, ActivityListItem, ActivitySummary, ActivityWithDetail};
pub use sync::SyncSummary;
pub use user::{LinkedAccount, User};
