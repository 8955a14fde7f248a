//! User record operations: reads, message recording, streak persistence,
//! split execution.

use super::{parse_decimal, Repository};
use crate::domain::{Decimal, GuildId, StockUser, TimeMs, UserId};
use sqlx::Row;

/// Permanent base-value increment per counted message.
fn base_value_step() -> Decimal {
    Decimal::new_scaled(1, 1)
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> StockUser {
    let base_value: String = row.get("base_value");
    let price_modifier: String = row.get("price_modifier");
    let streak_tier: i64 = row.get("streak_tier");

    StockUser {
        user_id: UserId::new(row.get::<String, _>("user_id")),
        guild_id: GuildId::new(row.get::<String, _>("guild_id")),
        username: row.get("username"),
        total_messages: row.get("total_messages"),
        base_value: parse_decimal("base_value", &base_value, Decimal::hundred()),
        last_message_time: TimeMs::new(row.get("last_message_time_ms")),
        price_modifier: parse_decimal("price_modifier", &price_modifier, Decimal::one()),
        streak_tier: streak_tier.clamp(0, 3) as u8,
        streak_tier_reached: TimeMs::new(row.get("streak_tier_reached_ms")),
    }
}

impl Repository {
    /// Fetch a user record. Returns None for unknown users; callers treat
    /// that as the flat default price, not an error.
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<StockUser>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, guild_id, username, total_messages, base_value,
                   last_message_time_ms, price_modifier, streak_tier, streak_tier_reached_ms
            FROM users
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    /// Write a complete user record, replacing any existing row.
    pub async fn upsert_user(&self, user: &StockUser) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO users
            (user_id, guild_id, username, total_messages, base_value,
             last_message_time_ms, price_modifier, streak_tier, streak_tier_reached_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.user_id.as_str())
        .bind(user.guild_id.as_str())
        .bind(&user.username)
        .bind(user.total_messages)
        .bind(user.base_value.to_canonical_string())
        .bind(user.last_message_time.as_i64())
        .bind(user.price_modifier.to_canonical_string())
        .bind(user.streak_tier as i64)
        .bind(user.streak_tier_reached.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record one counted message: bump the message counter and base value,
    /// stamp the last-activity time, and append an activity event, all in one
    /// transaction. Creates the user on first activity.
    pub async fn record_message(
        &self,
        user_id: &UserId,
        guild_id: &GuildId,
        username: &str,
        now: TimeMs,
    ) -> Result<StockUser, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            r#"
            SELECT user_id, guild_id, username, total_messages, base_value,
                   last_message_time_ms, price_modifier, streak_tier, streak_tier_reached_ms
            FROM users
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let mut user = existing
            .map(|r| row_to_user(&r))
            .unwrap_or_else(|| StockUser::new(user_id.clone(), guild_id.clone(), username));

        user.username = username.to_string();
        user.total_messages += 1;
        user.base_value = user.base_value + base_value_step();
        user.last_message_time = now;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO users
            (user_id, guild_id, username, total_messages, base_value,
             last_message_time_ms, price_modifier, streak_tier, streak_tier_reached_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.user_id.as_str())
        .bind(user.guild_id.as_str())
        .bind(&user.username)
        .bind(user.total_messages)
        .bind(user.base_value.to_canonical_string())
        .bind(user.last_message_time.as_i64())
        .bind(user.price_modifier.to_canonical_string())
        .bind(user.streak_tier as i64)
        .bind(user.streak_tier_reached.as_i64())
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO activity_events (user_id, time_ms) VALUES (?, ?)")
            .bind(user_id.as_str())
            .bind(now.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Persist a streak-tier transition. `reached` is 0 except when tier 3
    /// was just reached.
    pub async fn apply_streak_transition(
        &self,
        user_id: &UserId,
        tier: u8,
        reached: TimeMs,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET streak_tier = ?, streak_tier_reached_ms = ?
            WHERE user_id = ?
            "#,
        )
        .bind(tier as i64)
        .bind(reached.as_i64())
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Execute a 1:N split: divide the persisted price modifier by `factor`.
    pub async fn apply_split(&self, user_id: &UserId, factor: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT price_modifier FROM users WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = row {
            let raw: String = row.get("price_modifier");
            let modifier = parse_decimal("price_modifier", &raw, Decimal::one());
            let updated = modifier / Decimal::from_i64(factor);

            sqlx::query("UPDATE users SET price_modifier = ? WHERE user_id = ?")
                .bind(updated.to_canonical_string())
                .bind(user_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
