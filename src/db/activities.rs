// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity store: `activity_summaries` and `activity_details`.
//!
//! Summaries are keyed by `(account_id, provider_activity_id)` and details by
//! the summary's local id. Both upserts overwrite every mutable column and
//! never change the generated local id, so re-running a sync is safe.

use crate::db::{DbResult, SqliteDb};
use crate::models::{ActivityDetail, ActivityListItem, ActivitySummary, ActivityWithDetail};
use crate::time_utils::format_utc_rfc3339;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

/// Upper bound on rows returned by [`SqliteDb::get_page`].
pub const MAX_PAGE_LIMIT: u32 = 100;

impl SqliteDb {
    /// Insert or update a summary row, returning its local id.
    pub async fn upsert_summary(&self, summary: &ActivitySummary) -> DbResult<i64> {
        upsert_summary_with(self.pool(), summary).await
    }

    /// Insert or update the detail row for a local activity id.
    pub async fn upsert_detail(&self, activity_id: i64, detail: &ActivityDetail) -> DbResult<()> {
        upsert_detail_with(self.pool(), activity_id, detail).await
    }

    /// Write a summary and (optionally) its detail in one transaction.
    ///
    /// Either both rows are visible afterwards or neither changed.
    pub async fn save_activity(
        &self,
        summary: &ActivitySummary,
        detail: Option<&ActivityDetail>,
    ) -> DbResult<i64> {
        let mut tx = self.pool().begin().await?;

        let activity_id = upsert_summary_with(&mut *tx, summary).await?;
        if let Some(detail) = detail {
            upsert_detail_with(&mut *tx, activity_id, detail).await?;
        }

        tx.commit().await?;
        Ok(activity_id)
    }

    /// Get a page of an account's activities, newest calendar date first.
    ///
    /// `limit` is capped at [`MAX_PAGE_LIMIT`].
    pub async fn get_page(
        &self,
        account_id: i64,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<ActivityListItem>> {
        let limit = limit.min(MAX_PAGE_LIMIT);

        sqlx::query_as::<_, ActivityListItem>(
            "SELECT s.id, s.provider_activity_id, s.activity_type, s.name, s.distance,
                    s.moving_time, s.average_speed, s.average_pace, s.calories,
                    s.average_heartrate, s.max_heartrate, s.elevation_gain, s.start_date,
                    s.city, s.country,
                    u.first_name AS owner_first_name, u.last_name AS owner_last_name
             FROM activity_summaries s
             JOIN users u ON u.id = s.account_id
             WHERE s.account_id = ?1
             ORDER BY s.start_date DESC, s.id DESC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(account_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool())
        .await
    }

    /// Get one activity merged with its detail row.
    pub async fn get_one(&self, activity_id: i64) -> DbResult<Option<ActivityWithDetail>> {
        let row = sqlx::query(
            "SELECT s.id, s.account_id, s.provider_activity_id, s.activity_type, s.name,
                    s.distance, s.moving_time, s.average_speed, s.average_pace, s.calories,
                    s.average_heartrate, s.max_heartrate, s.elevation_gain, s.start_date,
                    s.city, s.country,
                    d.activity_id AS detail_id, d.max_speed, d.average_cadence,
                    d.average_watts, d.max_watts, d.kilojoules, d.calories AS detail_calories,
                    d.gear_name, d.device_name, d.polyline
             FROM activity_summaries s
             LEFT JOIN activity_details d ON d.activity_id = s.id
             WHERE s.id = ?1",
        )
        .bind(activity_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_activity).transpose()
    }

    /// Number of summary rows stored for an account.
    pub async fn count_activities(&self, account_id: i64) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_summaries WHERE account_id = ?1")
            .bind(account_id)
            .fetch_one(self.pool())
            .await
    }

    /// Number of detail rows stored for an account.
    pub async fn count_details(&self, account_id: i64) -> DbResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM activity_details d
             JOIN activity_summaries s ON s.id = d.activity_id
             WHERE s.account_id = ?1",
        )
        .bind(account_id)
        .fetch_one(self.pool())
        .await
    }
}

async fn upsert_summary_with<'e, E>(executor: E, summary: &ActivitySummary) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        "INSERT INTO activity_summaries (
            account_id, provider_activity_id, activity_type, name, distance, moving_time,
            average_speed, average_pace, calories, average_heartrate, max_heartrate,
            elevation_gain, start_date, city, country, synced_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(account_id, provider_activity_id) DO UPDATE SET
           activity_type = excluded.activity_type,
           name = excluded.name,
           distance = excluded.distance,
           moving_time = excluded.moving_time,
           average_speed = excluded.average_speed,
           average_pace = excluded.average_pace,
           calories = excluded.calories,
           average_heartrate = excluded.average_heartrate,
           max_heartrate = excluded.max_heartrate,
           elevation_gain = excluded.elevation_gain,
           start_date = excluded.start_date,
           city = excluded.city,
           country = excluded.country,
           synced_at = excluded.synced_at
         RETURNING id",
    )
    .bind(summary.account_id)
    .bind(summary.provider_activity_id)
    .bind(&summary.activity_type)
    .bind(&summary.name)
    .bind(summary.distance)
    .bind(summary.moving_time)
    .bind(summary.average_speed)
    .bind(summary.average_pace)
    .bind(summary.calories)
    .bind(summary.average_heartrate)
    .bind(summary.max_heartrate)
    .bind(summary.elevation_gain)
    .bind(&summary.start_date)
    .bind(&summary.city)
    .bind(&summary.country)
    .bind(format_utc_rfc3339(chrono::Utc::now()))
    .fetch_one(executor)
    .await
}

async fn upsert_detail_with<'e, E>(
    executor: E,
    activity_id: i64,
    detail: &ActivityDetail,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO activity_details (
            activity_id, max_speed, average_cadence, average_watts, max_watts, kilojoules,
            calories, gear_name, device_name, polyline, synced_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(activity_id) DO UPDATE SET
           max_speed = excluded.max_speed,
           average_cadence = excluded.average_cadence,
           average_watts = excluded.average_watts,
           max_watts = excluded.max_watts,
           kilojoules = excluded.kilojoules,
           calories = excluded.calories,
           gear_name = excluded.gear_name,
           device_name = excluded.device_name,
           polyline = excluded.polyline,
           synced_at = excluded.synced_at",
    )
    .bind(activity_id)
    .bind(detail.max_speed)
    .bind(detail.average_cadence)
    .bind(detail.average_watts)
    .bind(detail.max_watts)
    .bind(detail.kilojoules)
    .bind(detail.calories)
    .bind(&detail.gear_name)
    .bind(&detail.device_name)
    .bind(&detail.polyline)
    .bind(format_utc_rfc3339(chrono::Utc::now()))
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_activity(row: &SqliteRow) -> DbResult<ActivityWithDetail> {
    let summary = ActivitySummary {
        account_id: row.try_get("account_id")?,
        provider_activity_id: row.try_get("provider_activity_id")?,
        activity_type: row.try_get("activity_type")?,
        name: row.try_get("name")?,
        distance: row.try_get("distance")?,
        moving_time: row.try_get("moving_time")?,
        average_speed: row.try_get("average_speed")?,
        average_pace: row.try_get("average_pace")?,
        calories: row.try_get("calories")?,
        average_heartrate: row.try_get("average_heartrate")?,
        max_heartrate: row.try_get("max_heartrate")?,
        elevation_gain: row.try_get("elevation_gain")?,
        start_date: row.try_get("start_date")?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
    };

    let detail_id: Option<i64> = row.try_get("detail_id")?;
    let detail = match detail_id {
        Some(_) => Some(ActivityDetail {
            max_speed: row.try_get("max_speed")?,
            average_cadence: row.try_get("average_cadence")?,
            average_watts: row.try_get("average_watts")?,
            max_watts: row.try_get("max_watts")?,
            kilojoules: row.try_get("kilojoules")?,
            calories: row.try_get("detail_calories")?,
            gear_name: row.try_get("gear_name")?,
            device_name: row.try_get("device_name")?,
            polyline: row.try_get("polyline")?,
        }),
        None => None,
    };

    Ok(ActivityWithDetail {
        id: row.try_get("id")?,
        summary,
        detail,
    })
}
