// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Triforge: Strava activity sync for a multi-sport training tracker
//!
//! This crate provides the backend API that links Strava accounts, keeps
//! their OAuth tokens fresh, and mirrors their activities into a local
//! relational store.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SqliteDb;
use services::{ActivityReconciler, InMemorySyncLock, RetryPolicy, StravaClient, TokenManager};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SqliteDb,
    pub strava: StravaClient,
    pub token_manager: TokenManager,
    pub reconciler: ActivityReconciler,
    /// Cancelled on shutdown; every sync pass runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire up the Strava client, token manager and reconciler from `config`.
    pub fn new(config: Config, db: SqliteDb) -> anyhow::Result<Self> {
        let client = StravaClient::from_config(&config)?;

        let token_manager =
            TokenManager::new(client.clone(), db.clone(), config.token_refresh_margin_secs);

        let reconciler = ActivityReconciler::new(
            client.clone(),
            token_manager.clone(),
            db.clone(),
            Arc::new(InMemorySyncLock::new()),
            RetryPolicy::from_config(&config),
        )
        .with_config(&config);

        Ok(Self {
            config,
            db,
            strava: client,
            token_manager,
            reconciler,
            shutdown: CancellationToken::new(),
        })
    }
}
