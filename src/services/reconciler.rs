// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity sync pass.
//!
//! Handles the core workflow:
//! 1. Acquire the per-account sync lock and a valid access token
//! 2. Walk `/athlete/activities` until an empty page (all-or-nothing)
//! 3. Fetch each activity's detail record (best effort, per item)
//! 4. Upsert summary + detail in one transaction per activity
//!
//! Nothing is written until the full activity list has been fetched, and no
//! activity is ever deleted by a pass.

use crate::config::Config;
use crate::db::SqliteDb;
use crate::error::{ProviderError, SyncError};
use crate::models::{ActivityDetail, ActivitySummary, SyncSummary};
use crate::services::retry::RetryPolicy;
use crate::services::strava::{StravaActivity, StravaActivitySummary, StravaClient};
use crate::services::sync_lock::SyncLock;
use crate::services::token::TokenManager;
use crate::time_utils::calendar_date;
use futures_util::{stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Pagination guard against a provider that never returns an empty page.
const MAX_PAGES: u32 = 10_000;

/// Stage of a sync pass, recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    AcquiringToken,
    Paginating,
    EnrichingDetails,
    Upserting,
    Done,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::AcquiringToken => "acquiring_token",
            SyncPhase::Paginating => "paginating",
            SyncPhase::EnrichingDetails => "enriching_details",
            SyncPhase::Upserting => "upserting",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of writing one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    /// Summary and detail written
    Complete,
    /// Summary written without a detail row
    SummaryOnly,
    /// Nothing written
    Failed,
}

/// Syncs Strava activities into the local store.
#[derive(Clone)]
pub struct ActivityReconciler {
    client: StravaClient,
    tokens: TokenManager,
    db: SqliteDb,
    locks: Arc<dyn SyncLock>,
    retry: RetryPolicy,
    page_size: u32,
    detail_concurrency: usize,
}

impl ActivityReconciler {
    pub fn new(
        client: StravaClient,
        tokens: TokenManager,
        db: SqliteDb,
        locks: Arc<dyn SyncLock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            tokens,
            db,
            locks,
            retry,
            page_size: 30,
            detail_concurrency: 1,
        }
    }

    /// Apply the page size and detail concurrency from configuration.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.page_size = config.sync_page_size.max(1);
        self.detail_concurrency = config.detail_concurrency.max(1);
        self
    }

    /// Run one sync pass for `account_id`.
    ///
    /// Token and pagination failures abort the pass before anything is
    /// written. Detail fetch and per-activity write failures are counted in
    /// the returned summary instead.
    pub async fn sync_account(
        &self,
        account_id: i64,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        let _guard = self.locks.try_acquire(account_id).ok_or_else(|| {
            tracing::info!(account_id, "Sync already in progress, rejecting");
            SyncError::SyncInProgress(account_id)
        })?;

        let mut summary = SyncSummary {
            account_id,
            ..Default::default()
        };

        match self.run_pass(account_id, cancel, &mut summary).await {
            Ok(()) => {
                log_phase(account_id, SyncPhase::Done);
                tracing::info!(
                    account_id,
                    synced = summary.synced_count,
                    partial = summary.partial_count,
                    failed = summary.failed_count,
                    pages = summary.pages_fetched,
                    "Sync pass complete"
                );
                Ok(summary)
            }
            Err(e) => {
                log_phase(account_id, SyncPhase::Failed);
                log_failure(account_id, &e);
                Err(e)
            }
        }
    }

    async fn run_pass(
        &self,
        account_id: i64,
        cancel: &CancellationToken,
        summary: &mut SyncSummary,
    ) -> Result<(), SyncError> {
        log_phase(account_id, SyncPhase::AcquiringToken);
        let access_token = self.tokens.get_valid_access_token(account_id).await?;

        log_phase(account_id, SyncPhase::Paginating);
        let activities = self
            .fetch_all_summaries(account_id, &access_token, cancel, summary)
            .await?;

        tracing::info!(
            account_id,
            activities = activities.len(),
            pages = summary.pages_fetched,
            "Fetched activity list"
        );

        log_phase(account_id, SyncPhase::EnrichingDetails);
        // Futures own their inputs; the pass must be `Send` for `tokio::spawn`.
        let mut enriched = stream::iter(activities)
            .map(|activity| {
                let reconciler = self.clone();
                let token = access_token.clone();
                async move {
                    let detail = reconciler.fetch_detail(&token, activity.id).await;
                    (activity, detail)
                }
            })
            .buffered(self.detail_concurrency);

        log_phase(account_id, SyncPhase::Upserting);
        while let Some((activity, detail)) = enriched.next().await {
            if cancel.is_cancelled() {
                tracing::info!(account_id, synced = summary.synced_count, "Sync cancelled between activities");
                return Err(SyncError::Cancelled);
            }

            let detail_fetched = detail.is_some();
            let (row, detail_row) = merge_activity(account_id, &activity, detail.as_ref());

            match self.write_activity(&row, detail_row.as_ref()).await {
                WriteOutcome::Complete => summary.synced_count += 1,
                WriteOutcome::SummaryOnly => {
                    summary.synced_count += 1;
                    summary.partial_count += 1;
                    if detail_fetched {
                        tracing::debug!(account_id, provider_activity_id = activity.id, "Detail write failed, kept summary");
                    }
                }
                WriteOutcome::Failed => summary.failed_count += 1,
            }
        }

        Ok(())
    }

    /// Read every page of the activity list. Any error discards what was read.
    async fn fetch_all_summaries(
        &self,
        account_id: i64,
        access_token: &str,
        cancel: &CancellationToken,
        summary: &mut SyncSummary,
    ) -> Result<Vec<StravaActivitySummary>, SyncError> {
        let mut activities = Vec::new();
        let per_page = self.page_size;

        for page in 1..=MAX_PAGES {
            if cancel.is_cancelled() {
                tracing::info!(account_id, page, "Sync cancelled during pagination");
                return Err(SyncError::Cancelled);
            }

            let batch = self
                .retry
                .run("list_activities", move || {
                    self.client.list_activities(access_token, page, per_page)
                })
                .await?;
            summary.pages_fetched += 1;

            tracing::debug!(account_id, page, count = batch.len(), "Fetched activity page");

            if batch.is_empty() {
                return Ok(activities);
            }
            activities.extend(batch);
        }

        Err(SyncError::Provider(ProviderError::Malformed(format!(
            "activity list did not end after {} pages",
            MAX_PAGES
        ))))
    }

    /// Fetch one detail record. Failures are logged and yield `None`.
    async fn fetch_detail(&self, access_token: &str, activity_id: i64) -> Option<StravaActivity> {
        let result = self
            .retry
            .run("get_activity", move || {
                self.client.get_activity(access_token, activity_id)
            })
            .await;

        match result {
            Ok(detail) => Some(detail),
            Err(ProviderError::Malformed(msg)) => {
                tracing::error!(
                    provider_activity_id = activity_id,
                    kind = "malformed",
                    error = %msg,
                    "Malformed activity detail, syncing summary only"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    provider_activity_id = activity_id,
                    kind = e.kind(),
                    error = %e,
                    "Activity detail fetch failed, syncing summary only"
                );
                None
            }
        }
    }

    /// Write one activity atomically, falling back to summary-only.
    async fn write_activity(
        &self,
        row: &ActivitySummary,
        detail: Option<&ActivityDetail>,
    ) -> WriteOutcome {
        match self.db.save_activity(row, detail).await {
            Ok(_) if detail.is_some() => return WriteOutcome::Complete,
            Ok(_) => return WriteOutcome::SummaryOnly,
            Err(e) if detail.is_some() => {
                tracing::warn!(
                    account_id = row.account_id,
                    provider_activity_id = row.provider_activity_id,
                    error = %e,
                    "Failed to write activity with detail, retrying summary only"
                );
            }
            Err(e) => {
                tracing::error!(
                    account_id = row.account_id,
                    provider_activity_id = row.provider_activity_id,
                    error = %e,
                    "Failed to write activity"
                );
                return WriteOutcome::Failed;
            }
        }

        match self.db.save_activity(row, None).await {
            Ok(_) => WriteOutcome::SummaryOnly,
            Err(e) => {
                tracing::error!(
                    account_id = row.account_id,
                    provider_activity_id = row.provider_activity_id,
                    error = %e,
                    "Failed to write activity summary"
                );
                WriteOutcome::Failed
            }
        }
    }
}

fn log_phase(account_id: i64, phase: SyncPhase) {
    tracing::debug!(account_id, phase = %phase, "Sync phase");
}

fn log_failure(account_id: i64, err: &SyncError) {
    match err {
        SyncError::Provider(ProviderError::Malformed(msg)) => {
            tracing::error!(account_id, kind = "malformed", error = %msg, "Sync pass failed: malformed Strava response");
        }
        SyncError::Provider(e) => {
            tracing::warn!(account_id, kind = e.kind(), error = %e, "Sync pass failed");
        }
        SyncError::Persistence(e) => {
            tracing::error!(account_id, error = %e, "Sync pass failed: database error");
        }
        other => {
            tracing::info!(account_id, error = %other, "Sync pass aborted");
        }
    }
}

/// Build the summary and detail rows for one activity.
///
/// Detail calories supersede the list figure when Strava provides them.
pub fn merge_activity(
    account_id: i64,
    activity: &StravaActivitySummary,
    detail: Option<&StravaActivity>,
) -> (ActivitySummary, Option<ActivityDetail>) {
    let calories = detail.and_then(|d| d.calories).or(activity.calories);

    let summary = ActivitySummary {
        account_id,
        provider_activity_id: activity.id,
        activity_type: activity.kind().to_string(),
        name: activity.name.clone(),
        distance: activity.distance,
        moving_time: activity.moving_time,
        average_speed: activity.average_speed,
        average_pace: activity.average_speed.and_then(pace_seconds_per_km),
        calories,
        average_heartrate: activity.average_heartrate,
        max_heartrate: activity.max_heartrate,
        elevation_gain: activity.total_elevation_gain,
        start_date: calendar_date(&activity.start_date_local)
            .unwrap_or_else(|| activity.start_date_local.clone()),
        city: activity.location_city.clone(),
        country: activity.location_country.clone(),
    };

    let detail = detail.map(|d| ActivityDetail {
        max_speed: d.max_speed,
        average_cadence: d.average_cadence,
        average_watts: d.average_watts,
        max_watts: d.max_watts,
        kilojoules: d.kilojoules,
        calories: d.calories,
        gear_name: d.gear.as_ref().and_then(|g| g.name.clone()),
        device_name: d.device_name.clone(),
        polyline: d.get_polyline().map(str::to_string),
    });

    (summary, detail)
}

/// Seconds per kilometer for a speed in m/s.
fn pace_seconds_per_km(speed: f64) -> Option<f64> {
    (speed > 0.0).then(|| 1000.0 / speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_item(calories: Option<f64>) -> StravaActivitySummary {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "name": "Long Run",
            "sport_type": "Run",
            "distance": 21097.5,
            "moving_time": 6300,
            "average_speed": 3.35,
            "calories": calories,
            "average_heartrate": 151.2,
            "total_elevation_gain": 120.0,
            "start_date_local": "2024-04-14T08:00:00Z",
            "location_city": "Boston",
            "location_country": "United States"
        }))
        .unwrap()
    }

    fn detail(calories: Option<f64>) -> StravaActivity {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "max_speed": 5.1,
            "average_cadence": 86.0,
            "calories": calories,
            "gear": {"name": "Vaporfly 3"},
            "device_name": "COROS PACE 3",
            "map": {"polyline": "abc", "summary_polyline": "a"}
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_without_detail() {
        let (summary, detail_row) = merge_activity(7, &list_item(Some(900.0)), None);

        assert_eq!(summary.account_id, 7);
        assert_eq!(summary.provider_activity_id, 42);
        assert_eq!(summary.activity_type, "Run");
        assert_eq!(summary.start_date, "2024-04-14");
        assert_eq!(summary.calories, Some(900.0));
        assert!(detail_row.is_none());
    }

    #[test]
    fn test_merge_detail_calories_supersede_summary() {
        let (summary, detail_row) =
            merge_activity(7, &list_item(Some(900.0)), Some(&detail(Some(1350.0))));

        assert_eq!(summary.calories, Some(1350.0));
        let detail_row = detail_row.unwrap();
        assert_eq!(detail_row.calories, Some(1350.0));
        assert_eq!(detail_row.gear_name.as_deref(), Some("Vaporfly 3"));
        assert_eq!(detail_row.polyline.as_deref(), Some("abc"));
    }

    #[test]
    fn test_merge_keeps_summary_calories_when_detail_has_none() {
        let (summary, _) = merge_activity(7, &list_item(Some(900.0)), Some(&detail(None)));
        assert_eq!(summary.calories, Some(900.0));
    }

    #[test]
    fn test_pace_from_speed() {
        let pace = pace_seconds_per_km(4.0).unwrap();
        assert!((pace - 250.0).abs() < f64::EPSILON);
        assert_eq!(pace_seconds_per_km(0.0), None);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SyncPhase::EnrichingDetails.to_string(), "enriching_details");
    }
}
