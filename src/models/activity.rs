// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity models for storage and API.

use serde::{Deserialize, Serialize};

/// Summary row in `activity_summaries`, as written by a sync pass.
///
/// `(account_id, provider_activity_id)` is the natural key; every other
/// field is overwritten on re-sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    /// Local account ID (owner)
    pub account_id: i64,
    /// Strava activity ID
    pub provider_activity_id: i64,
    /// Sport type (Ride, Run, Swim, etc.)
    pub activity_type: String,
    /// Activity name/title
    pub name: String,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: i64,
    /// Average speed in m/s
    pub average_speed: Option<f64>,
    /// Average pace in seconds per kilometer
    pub average_pace: Option<f64>,
    pub calories: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    /// Elevation gain in meters
    pub elevation_gain: Option<f64>,
    /// Local calendar date ("YYYY-MM-DD")
    pub start_date: String,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Detail row in `activity_details`, one-to-one with a summary row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityDetail {
    /// Max speed in m/s
    pub max_speed: Option<f64>,
    pub average_cadence: Option<f64>,
    /// Average power in watts
    pub average_watts: Option<f64>,
    /// Max power in watts
    pub max_watts: Option<f64>,
    /// Energy expenditure in kJ
    pub kilojoules: Option<f64>,
    pub calories: Option<f64>,
    /// Gear (bike/shoes) name
    pub gear_name: Option<String>,
    /// Recording device (e.g. "Garmin Edge 530")
    pub device_name: Option<String>,
    /// Encoded route polyline
    pub polyline: Option<String>,
}

/// Activity list entry joined with the owner's display name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityListItem {
    /// Local activity ID
    pub id: i64,
    pub provider_activity_id: i64,
    pub activity_type: String,
    pub name: String,
    pub distance: f64,
    pub moving_time: i64,
    pub average_speed: Option<f64>,
    pub average_pace: Option<f64>,
    pub calories: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub elevation_gain: Option<f64>,
    pub start_date: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

/// A single activity with its detail record, if one was synced.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityWithDetail {
    /// Local activity ID
    pub id: i64,
    #[serde(flatten)]
    pub summary: ActivitySummary,
    pub detail: Option<ActivityDetail>,
}
