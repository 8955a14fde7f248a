//! Per-guild settings rows and market events.

use super::{parse_decimal, Repository};
use crate::domain::{
    ActivityTierSettings, Decimal, GuildId, MarketEvent, MarketSettings, TierBand, TimeMs,
};
use sqlx::Row;

impl Repository {
    // =========================================================================
    // Market-protection settings
    // =========================================================================

    pub async fn get_market_settings(
        &self,
        guild_id: &GuildId,
    ) -> Result<Option<MarketSettings>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT sell_cooldown_minutes, sell_cooldown_enabled,
                   price_impact_delay_minutes, price_impact_enabled,
                   short_term_threshold_hours, short_term_tax_percent,
                   long_term_tax_percent, capital_gains_enabled
            FROM market_settings
            WHERE guild_id = ?
            "#,
        )
        .bind(guild_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let short_rate: String = r.get("short_term_tax_percent");
            let long_rate: String = r.get("long_term_tax_percent");
            MarketSettings {
                sell_cooldown_minutes: r.get("sell_cooldown_minutes"),
                sell_cooldown_enabled: r.get::<i64, _>("sell_cooldown_enabled") != 0,
                price_impact_delay_minutes: r.get("price_impact_delay_minutes"),
                price_impact_enabled: r.get::<i64, _>("price_impact_enabled") != 0,
                short_term_threshold_hours: r.get("short_term_threshold_hours"),
                short_term_tax_percent: parse_decimal(
                    "short_term_tax_percent",
                    &short_rate,
                    Decimal::from_i64(25),
                ),
                long_term_tax_percent: parse_decimal(
                    "long_term_tax_percent",
                    &long_rate,
                    Decimal::zero(),
                ),
                capital_gains_enabled: r.get::<i64, _>("capital_gains_enabled") != 0,
            }
        }))
    }

    pub async fn put_market_settings(
        &self,
        guild_id: &GuildId,
        settings: &MarketSettings,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO market_settings
            (guild_id, sell_cooldown_minutes, sell_cooldown_enabled,
             price_impact_delay_minutes, price_impact_enabled,
             short_term_threshold_hours, short_term_tax_percent,
             long_term_tax_percent, capital_gains_enabled)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guild_id.as_str())
        .bind(settings.sell_cooldown_minutes)
        .bind(settings.sell_cooldown_enabled as i64)
        .bind(settings.price_impact_delay_minutes)
        .bind(settings.price_impact_enabled as i64)
        .bind(settings.short_term_threshold_hours)
        .bind(settings.short_term_tax_percent.to_canonical_string())
        .bind(settings.long_term_tax_percent.to_canonical_string())
        .bind(settings.capital_gains_enabled as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Activity-tier settings
    // =========================================================================

    pub async fn get_tier_settings(
        &self,
        guild_id: &GuildId,
    ) -> Result<Option<ActivityTierSettings>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT tiered_enabled, window_days,
                   tier1_max, tier1_rate, tier2_max, tier2_rate,
                   tier3_max, tier3_rate, tier4_rate
            FROM activity_tier_settings
            WHERE guild_id = ?
            "#,
        )
        .bind(guild_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let defaults = ActivityTierSettings::default();
            let rate = |field: &str, fallback: Decimal| {
                let raw: String = r.get(field);
                parse_decimal(field, &raw, fallback)
            };
            ActivityTierSettings {
                tiered_enabled: r.get::<i64, _>("tiered_enabled") != 0,
                window_days: r.get("window_days"),
                bands: [
                    TierBand {
                        max_messages: Some(r.get("tier1_max")),
                        rate_percent: rate("tier1_rate", defaults.bands[0].rate_percent),
                    },
                    TierBand {
                        max_messages: Some(r.get("tier2_max")),
                        rate_percent: rate("tier2_rate", defaults.bands[1].rate_percent),
                    },
                    TierBand {
                        max_messages: Some(r.get("tier3_max")),
                        rate_percent: rate("tier3_rate", defaults.bands[2].rate_percent),
                    },
                    TierBand {
                        max_messages: None,
                        rate_percent: rate("tier4_rate", defaults.bands[3].rate_percent),
                    },
                ],
            }
        }))
    }

    pub async fn put_tier_settings(
        &self,
        guild_id: &GuildId,
        settings: &ActivityTierSettings,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO activity_tier_settings
            (guild_id, tiered_enabled, window_days,
             tier1_max, tier1_rate, tier2_max, tier2_rate,
             tier3_max, tier3_rate, tier4_rate)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guild_id.as_str())
        .bind(settings.tiered_enabled as i64)
        .bind(settings.window_days)
        .bind(settings.bands[0].max_messages.unwrap_or(0))
        .bind(settings.bands[0].rate_percent.to_canonical_string())
        .bind(settings.bands[1].max_messages.unwrap_or(0))
        .bind(settings.bands[1].rate_percent.to_canonical_string())
        .bind(settings.bands[2].max_messages.unwrap_or(0))
        .bind(settings.bands[2].rate_percent.to_canonical_string())
        .bind(settings.bands[3].rate_percent.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Market events
    // =========================================================================

    /// The active market event for a guild, if any. Expired rows are treated
    /// as absent.
    pub async fn active_market_event(
        &self,
        guild_id: &GuildId,
        now: TimeMs,
    ) -> Result<Option<MarketEvent>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT multiplier, percent_change, expires_at_ms, event_name
            FROM market_events
            WHERE guild_id = ? AND expires_at_ms > ?
            "#,
        )
        .bind(guild_id.as_str())
        .bind(now.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let multiplier: String = r.get("multiplier");
            let percent_change: String = r.get("percent_change");
            MarketEvent {
                multiplier: parse_decimal("multiplier", &multiplier, Decimal::one()),
                percent_change: parse_decimal("percent_change", &percent_change, Decimal::zero()),
                expires_at: TimeMs::new(r.get("expires_at_ms")),
                event_name: r.get("event_name"),
            }
        }))
    }

    /// Set the guild's active market event, replacing any prior one.
    pub async fn set_market_event(
        &self,
        guild_id: &GuildId,
        event: &MarketEvent,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO market_events
            (guild_id, multiplier, percent_change, expires_at_ms, event_name)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(guild_id.as_str())
        .bind(event.multiplier.to_canonical_string())
        .bind(event.percent_change.to_canonical_string())
        .bind(event.expires_at.as_i64())
        .bind(&event.event_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn clear_market_event(&self, guild_id: &GuildId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM market_events WHERE guild_id = ?")
            .bind(guild_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
