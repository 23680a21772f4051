// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::{json, Value};
use std::sync::Arc;
use triforge::config::Config;
use triforge::db::SqliteDb;
use triforge::models::{ActivityDetail, ActivitySummary, LinkedAccount, User};
use triforge::routes::create_router;
use triforge::time_utils::now_unix;
use triforge::AppState;

/// Create an empty in-memory database with the schema applied.
#[allow(dead_code)]
pub async fn test_db() -> SqliteDb {
    SqliteDb::connect_in_memory()
        .await
        .expect("Failed to open in-memory SQLite")
}

/// Offline config pointing every Strava URL at `server_uri`.
#[allow(dead_code)]
pub fn test_config(server_uri: &str) -> Config {
    Config {
        strava_api_url: server_uri.to_string(),
        strava_oauth_url: format!("{}/oauth", server_uri),
        retry_max_attempts: 1,
        retry_base_delay_ms: 0,
        ..Config::test_default()
    }
}

/// Insert a local user row.
#[allow(dead_code)]
pub async fn seed_user(db: &SqliteDb, account_id: i64) {
    db.upsert_user(&User {
        id: account_id,
        first_name: "Test".to_string(),
        last_name: format!("User{}", account_id),
        email: Some(format!("user{}@example.com", account_id)),
    })
    .await
    .expect("Failed to seed user");
}

/// Insert a user with a linked Strava account whose token expires at `expires_at`.
#[allow(dead_code)]
pub async fn seed_linked_account(db: &SqliteDb, account_id: i64, expires_at: i64) {
    seed_user(db, account_id).await;
    db.set_linked_account(&LinkedAccount {
        account_id,
        access_token: "valid_access".to_string(),
        refresh_token: "stored_refresh".to_string(),
        expires_at,
    })
    .await
    .expect("Failed to seed linked account");
}

/// Linked account whose token is good for another hour.
#[allow(dead_code)]
pub async fn seed_valid_account(db: &SqliteDb, account_id: i64) {
    seed_linked_account(db, account_id, now_unix() + 3600).await;
}

/// Create a test app backed by `db` and talking to the Strava stand-in at `config`.
#[allow(dead_code)]
pub fn create_test_app(config: Config, db: SqliteDb) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Session token for `account_id` signed with the test config's key.
#[allow(dead_code)]
pub fn create_test_jwt(account_id: i64) -> String {
    let config = Config::test_default();
    triforge::middleware::auth::create_jwt(account_id, &config.jwt_signing_key)
        .expect("Failed to create JWT")
}

/// One entry of `/athlete/activities`.
#[allow(dead_code)]
pub fn summary_json(id: i64, distance: f64) -> Value {
    json!({
        "id": id,
        "name": format!("Activity {}", id),
        "sport_type": "Ride",
        "type": "Ride",
        "distance": distance,
        "moving_time": 3600,
        "average_speed": 5.0,
        "calories": 500.0,
        "total_elevation_gain": 250.0,
        "start_date_local": "2024-06-01T07:30:00Z",
        "location_city": "Palo Alto",
        "location_country": "United States"
    })
}

/// A page of `count` list entries with IDs starting at `first_id`.
#[allow(dead_code)]
pub fn summary_page(first_id: i64, count: i64) -> Value {
    Value::Array(
        (first_id..first_id + count)
            .map(|id| summary_json(id, 10_000.0))
            .collect(),
    )
}

/// A `/activities/{id}` detail record.
#[allow(dead_code)]
pub fn detail_json(id: i64) -> Value {
    json!({
        "id": id,
        "max_speed": 14.2,
        "average_cadence": 88.0,
        "average_watts": 210.0,
        "max_watts": 640.0,
        "kilojoules": 756.0,
        "calories": 820.0,
        "gear": {"name": "Canyon Ultimate"},
        "device_name": "Garmin Edge 540",
        "map": {"polyline": "_p~iF~ps|U_ulLnnqC", "summary_polyline": "_p~iF"}
    })
}

/// Token endpoint response.
#[allow(dead_code)]
pub fn token_json(access: &str, refresh: &str, expires_at: i64) -> Value {
    json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_at": expires_at,
        "expires_in": 21600,
        "athlete": {"id": 9001, "firstname": "Test", "lastname": "Athlete"}
    })
}

/// Store-level activity for read API tests.
#[allow(dead_code)]
pub fn sample_activity(account_id: i64, provider_activity_id: i64, date: &str) -> ActivitySummary {
    ActivitySummary {
        account_id,
        provider_activity_id,
        activity_type: "Run".to_string(),
        name: format!("Run {}", provider_activity_id),
        distance: 8000.0,
        moving_time: 2400,
        average_speed: Some(3.33),
        average_pace: Some(300.0),
        calories: Some(600.0),
        average_heartrate: Some(148.0),
        max_heartrate: Some(171.0),
        elevation_gain: Some(40.0),
        start_date: date.to_string(),
        city: None,
        country: None,
    }
}

#[allow(dead_code)]
pub fn sample_detail() -> ActivityDetail {
    ActivityDetail {
        max_speed: Some(4.8),
        device_name: Some("COROS PACE 3".to_string()),
        ..Default::default()
    }
}
