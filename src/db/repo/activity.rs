//! Activity event log: the append-only record of counted interactions.
//!
//! Entries past the lookback windows are ignored by queries, never pruned.

use super::Repository;
use crate::domain::{TimeMs, UserId};
use sqlx::Row;

impl Repository {
    /// Append one activity event outside the message path (reactions, slash
    /// commands counted by the activity collaborator).
    pub async fn append_activity(
        &self,
        user_id: &UserId,
        time_ms: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO activity_events (user_id, time_ms) VALUES (?, ?)")
            .bind(user_id.as_str())
            .bind(time_ms.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All activity timestamps for a user at or after `since`, ascending.
    pub async fn activity_events_since(
        &self,
        user_id: &UserId,
        since: TimeMs,
    ) -> Result<Vec<TimeMs>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT time_ms
            FROM activity_events
            WHERE user_id = ? AND time_ms >= ?
            ORDER BY time_ms ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .bind(since.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TimeMs::new(row.get("time_ms")))
            .collect())
    }
}
