// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::activities::MAX_PAGE_LIMIT;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityListItem, ActivityWithDetail, SyncSummary};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_PAGE_LIMIT: u32 = 20;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/strava/sync", post(sync_activities))
        .route("/api/activities", get(get_activities))
        .route("/api/activities/{id}", get(get_activity))
}

// ─── Sync ────────────────────────────────────────────────────

/// Run one sync pass for the caller's linked Strava account.
async fn sync_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SyncSummary>> {
    tracing::info!(account_id = user.account_id, "Sync requested");

    let cancel = state.shutdown.child_token();
    let summary = state
        .reconciler
        .sync_account(user.account_id, &cancel)
        .await?;

    Ok(Json(summary))
}

// ─── Activities ──────────────────────────────────────────────

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityListItem>,
    pub limit: u32,
    pub offset: u32,
    /// All stored activities for the account, not just this page.
    pub total: i64,
}

/// List the caller's activities, most recent first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    let limit = params.limit.min(MAX_PAGE_LIMIT);

    tracing::debug!(
        account_id = user.account_id,
        limit,
        offset = params.offset,
        "Fetching activities"
    );

    let activities = state
        .db
        .get_page(user.account_id, limit, params.offset)
        .await?;
    let total = state.db.count_activities(user.account_id).await?;

    Ok(Json(ActivitiesResponse {
        activities,
        limit,
        offset: params.offset,
        total,
    }))
}

/// Get one activity with its detail record.
async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<ActivityWithDetail>> {
    let activity = state
        .db
        .get_one(id)
        .await?
        .filter(|a| a.summary.account_id == user.account_id)
        .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))?;

    Ok(Json(activity))
}
