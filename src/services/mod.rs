// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod reconciler;
pub mod retry;
pub mod strava;
pub mod sync_lock;
pub mod token;

pub use reconciler::{merge_activity, ActivityReconciler, SyncPhase};
pub use retry::RetryPolicy;
pub use strava::{StravaClient, StravaCredentials};
pub use sync_lock::{InMemorySyncLock, SyncLock, SyncLockGuard};
pub use token::TokenManager;
