// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (SQLite via sqlx).

pub mod activities;
pub mod sqlite;
pub mod tokens;

pub use sqlite::SqliteDb;

/// Result type for store operations.
pub type DbResult<T> = std::result::Result<T, sqlx::Error>;

