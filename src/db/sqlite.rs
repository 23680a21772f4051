// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite connection pool, schema setup and user lookups.
//!
//! Store operations are split by table group:
//! - Users (this file)
//! - Linked accounts / OAuth tokens (`tokens.rs`)
//! - Activity summaries and details (`activities.rs`)

use crate::db::DbResult;
use crate::models::User;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const MAX_CONNECTIONS: u32 = 5;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS linked_accounts (
        account_id INTEGER PRIMARY KEY REFERENCES users(id),
        access_token TEXT NOT NULL,
        refresh_token TEXT NOT NULL,
        expires_at INTEGER NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS activity_summaries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL REFERENCES users(id),
        provider_activity_id INTEGER NOT NULL,
        activity_type TEXT NOT NULL,
        name TEXT NOT NULL,
        distance REAL NOT NULL,
        moving_time INTEGER NOT NULL,
        average_speed REAL,
        average_pace REAL,
        calories REAL,
        average_heartrate REAL,
        max_heartrate REAL,
        elevation_gain REAL,
        start_date TEXT NOT NULL,
        city TEXT,
        country TEXT,
        synced_at TEXT NOT NULL,
        UNIQUE (account_id, provider_activity_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS activity_summaries_account_date_idx
        ON activity_summaries(account_id, start_date)",
    r#"CREATE TABLE IF NOT EXISTS activity_details (
        activity_id INTEGER PRIMARY KEY REFERENCES activity_summaries(id) ON DELETE CASCADE,
        max_speed REAL,
        average_cadence REAL,
        average_watts REAL,
        max_watts REAL,
        kilojoules REAL,
        calories REAL,
        gear_name TEXT,
        device_name TEXT,
        polyline TEXT,
        synced_at TEXT NOT NULL
    )"#,
];

/// SQLite database client.
#[derive(Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
}

impl SqliteDb {
    /// Open (or create) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(url = database_url, "Connected to SQLite");
        Ok(db)
    }

    /// Private in-memory database for tests.
    ///
    /// Every connection to `sqlite::memory:` is a separate database, so the
    /// pool is pinned to a single connection that never expires.
    pub async fn connect_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> DbResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by local account ID.
    pub async fn get_user(&self, id: i64) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT id, first_name, last_name, email FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, email)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               first_name = excluded.first_name,
               last_name = excluded.last_name,
               email = excluded.email",
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
