// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token refresh behavior.
//!
//! These tests verify that:
//! 1. A valid stored token is used without contacting Strava
//! 2. An expired token is refreshed exactly once and the new triple persisted
//! 3. A failed refresh leaves the stored triple untouched

use tokio_util::sync::CancellationToken;
use triforge::db::SqliteDb;
use triforge::error::{ProviderError, SyncError};
use triforge::services::{StravaClient, TokenManager};
use triforge::time_utils::now_unix;
use triforge::AppState;
use wiremock::matchers::{any, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

const ACCOUNT: i64 = 3;

fn token_manager(server: &MockServer, db: &SqliteDb) -> TokenManager {
    let config = common::test_config(&server.uri());
    let client = StravaClient::from_config(&config).unwrap();
    TokenManager::new(client, db.clone(), config.token_refresh_margin_secs)
}

#[tokio::test]
async fn test_valid_token_makes_no_network_call() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_valid_account(&db, ACCOUNT).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token = token_manager(&server, &db)
        .get_valid_access_token(ACCOUNT)
        .await
        .unwrap();

    assert_eq!(token, "valid_access");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once_and_persisted() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_linked_account(&db, ACCOUNT, now_unix() - 60).await;

    let new_expiry = now_unix() + 21600;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored_refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_json(
                "fresh_access",
                "fresh_refresh",
                new_expiry,
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = token_manager(&server, &db);
    let token = manager.get_valid_access_token(ACCOUNT).await.unwrap();
    assert_eq!(token, "fresh_access");

    let stored = db.get_linked_account(ACCOUNT).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh_access");
    assert_eq!(stored.refresh_token, "fresh_refresh");
    assert_eq!(stored.expires_at, new_expiry);

    // Second call uses the refreshed token without another request
    assert_eq!(
        manager.get_valid_access_token(ACCOUNT).await.unwrap(),
        "fresh_access"
    );
}

#[tokio::test]
async fn test_token_at_exact_expiry_is_refreshed() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_linked_account(&db, ACCOUNT, now_unix()).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_json(
                "fresh_access",
                "fresh_refresh",
                now_unix() + 21600,
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = token_manager(&server, &db)
        .get_valid_access_token(ACCOUNT)
        .await
        .unwrap();
    assert_eq!(token, "fresh_access");
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_linked_account(&db, ACCOUNT, now_unix() - 60).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_json(
                "fresh_access",
                "fresh_refresh",
                now_unix() + 21600,
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = token_manager(&server, &db);
    let (a, b) = tokio::join!(
        manager.get_valid_access_token(ACCOUNT),
        manager.get_valid_access_token(ACCOUNT)
    );

    assert_eq!(a.unwrap(), "fresh_access");
    assert_eq!(b.unwrap(), "fresh_access");
}

#[tokio::test]
async fn test_rejected_refresh_leaves_state_unchanged() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    let expired_at = now_unix() - 60;
    common::seed_linked_account(&db, ACCOUNT, expired_at).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "message": "Bad Request",
            "errors": [{"resource": "RefreshToken", "field": "refresh_token", "code": "invalid"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = token_manager(&server, &db)
        .get_valid_access_token(ACCOUNT)
        .await;
    assert!(matches!(result, Err(SyncError::ProviderAuth(_))));

    let stored = db.get_linked_account(ACCOUNT).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "valid_access");
    assert_eq!(stored.refresh_token, "stored_refresh");
    assert_eq!(stored.expires_at, expired_at);
}

#[tokio::test]
async fn test_transient_refresh_failure_is_provider_error() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_linked_account(&db, ACCOUNT, now_unix() - 60).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let result = token_manager(&server, &db)
        .get_valid_access_token(ACCOUNT)
        .await;

    assert!(matches!(
        result,
        Err(SyncError::Provider(ProviderError::Server { status: 502 }))
    ));
    let stored = db.get_linked_account(ACCOUNT).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token, "stored_refresh");
}

#[tokio::test]
async fn test_missing_link_is_reported() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_user(&db, ACCOUNT).await;

    let result = token_manager(&server, &db)
        .get_valid_access_token(ACCOUNT)
        .await;
    assert!(matches!(result, Err(SyncError::AccountNotLinked(ACCOUNT))));
}

#[tokio::test]
async fn test_link_account_stores_token_triple() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_user(&db, ACCOUNT).await;

    let expires_at = now_unix() + 21600;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth_code_123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_json(
                "linked_access",
                "linked_refresh",
                expires_at,
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let linked = token_manager(&server, &db)
        .link_account(ACCOUNT, "auth_code_123")
        .await
        .unwrap();
    assert_eq!(linked.access_token, "linked_access");

    let stored = db.get_linked_account(ACCOUNT).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token, "linked_refresh");
    assert_eq!(stored.expires_at, expires_at);
}

#[tokio::test]
async fn test_sync_with_expired_token_uses_refreshed_token() {
    let server = MockServer::start().await;
    let db = common::test_db().await;
    common::seed_linked_account(&db, ACCOUNT, now_unix() - 60).await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_json(
                "fresh_access",
                "fresh_refresh",
                now_unix() + 21600,
            )),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/athlete/activities"))
        .and(header("authorization", "Bearer fresh_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let state = AppState::new(common::test_config(&server.uri()), db.clone()).unwrap();
    let summary = state
        .reconciler
        .sync_account(ACCOUNT, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_fetched, 1);
}
