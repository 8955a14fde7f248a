//! Stock price valuation.
//!
//! Price is recomputed from persisted state and the caller's clock on every
//! call; there is no cached quote. The only write a calculation may perform
//! is a streak-tier transition, and that write is idempotent.

use super::streak::{self, StreakComputation, STREAK_LOOKBACK_DAYS};
use super::{activity, MarketEventSource, StreakInfo};
use crate::db::Repository;
use crate::domain::{Decimal, GuildId, StockUser, TimeMs, UserId, MS_PER_DAY};
use crate::error::AppError;
use crate::market::ShareSupplySource;
use chrono::FixedOffset;
use std::sync::Arc;
use tracing::debug;

/// Grace period before inactivity decay starts.
const DECAY_GRACE_DAYS: i64 = 3;

/// Flat price for users with no record yet.
fn default_price() -> Decimal {
    Decimal::hundred()
}

/// Decay multiplier from inactivity: 3% per day past the grace period,
/// capped at 30%. Applies to the computed price only, never to the stored
/// base value. Users with no recorded activity at all do not decay.
pub fn decay_multiplier(last_message_time: TimeMs, now: TimeMs) -> Decimal {
    if last_message_time.as_i64() <= 0 {
        return Decimal::one();
    }

    let grace = Decimal::from_i64(DECAY_GRACE_DAYS);
    let days_since = Decimal::from_i64(now.since(last_message_time).max(0))
        / Decimal::from_i64(MS_PER_DAY);
    if days_since <= grace {
        return Decimal::one();
    }

    let inactive_days = (days_since - grace).floor();
    let decay = (inactive_days * Decimal::new_scaled(3, 2)).min(Decimal::new_scaled(3, 1));
    Decimal::one() - decay
}

/// Demand multiplier from outstanding shares: 0.3% per share, capped at +30%.
pub fn demand_multiplier(shares: i64) -> Decimal {
    let uplift = (Decimal::from_i64(shares) * Decimal::new_scaled(3, 3))
        .min(Decimal::new_scaled(3, 1));
    Decimal::one() + uplift
}

/// Computes a user's stock price from activity, streaks, decay, demand,
/// splits, and market events.
pub struct ValuationEngine {
    repo: Arc<Repository>,
    settings: Arc<crate::settings::SettingsStore>,
    supply: Arc<dyn ShareSupplySource>,
    market_events: Arc<dyn MarketEventSource>,
    day_boundary: FixedOffset,
}

impl ValuationEngine {
    pub fn new(
        repo: Arc<Repository>,
        settings: Arc<crate::settings::SettingsStore>,
        supply: Arc<dyn ShareSupplySource>,
        market_events: Arc<dyn MarketEventSource>,
        day_boundary: FixedOffset,
    ) -> Self {
        ValuationEngine {
            repo,
            settings,
            supply,
            market_events,
            day_boundary,
        }
    }

    /// Current price at the caller's clock, rounded to cents.
    ///
    /// Unknown users price at a flat 100.00; that is a legitimate starting
    /// state, not an error. With a guild context the demand multiplier uses
    /// the market layer's effective share count and the guild's market-event
    /// multiplier; without one it falls back to raw holdings and no event.
    pub async fn price_at(
        &self,
        user_id: &UserId,
        guild_id: Option<&GuildId>,
        now: TimeMs,
    ) -> Result<Decimal, AppError> {
        let Some(user) = self.repo.get_user(user_id).await? else {
            return Ok(default_price().round_dp(2));
        };

        let tiers = self.settings.tier_settings(guild_id).await?;
        let window_start = now - tiers.window_days * MS_PER_DAY;
        let window_events = self.repo.activity_events_since(user_id, window_start).await?;
        let activity_multiplier = activity::multiplier(&window_events, &tiers, self.day_boundary);

        let streak = self.evaluate_streak(&user, now).await?;

        let mut price =
            user.base_value * activity_multiplier * (Decimal::one() + streak.bonus);

        price = price * decay_multiplier(user.last_message_time, now);

        let actual_shares = self.repo.total_outstanding_shares(user_id).await?;
        let effective_shares = match guild_id {
            Some(guild) => {
                self.supply
                    .effective_count(guild, user_id, actual_shares, now)
                    .await?
            }
            None => actual_shares,
        };
        price = price * demand_multiplier(effective_shares);

        price = price * user.price_modifier;

        if let Some(guild) = guild_id {
            if let Some(event_multiplier) =
                self.market_events.active_multiplier(guild, now).await?
            {
                price = price * event_multiplier;
            }
        }

        debug!(
            user = %user_id,
            activity = %activity_multiplier,
            streak_tier = streak.tier,
            shares = effective_shares,
            "Computed stock price"
        );

        Ok(price.round_dp(2))
    }

    /// Streak state for a user, persisting any tier transition.
    ///
    /// Shares the evaluation path with pricing so the two never disagree.
    pub async fn streak_info_at(
        &self,
        user_id: &UserId,
        now: TimeMs,
    ) -> Result<StreakInfo, AppError> {
        let Some(user) = self.repo.get_user(user_id).await? else {
            return Ok(StreakInfo {
                days: 0,
                tier: 0,
                bonus: Decimal::zero(),
                new_tier: false,
                expired: false,
            });
        };

        let comp = self.evaluate_streak(&user, now).await?;
        Ok(StreakInfo {
            days: comp.days,
            tier: comp.tier,
            bonus: comp.bonus,
            new_tier: comp.new_tier,
            expired: comp.expired,
        })
    }

    /// Pure streak computation plus the explicit transition write.
    async fn evaluate_streak(
        &self,
        user: &StockUser,
        now: TimeMs,
    ) -> Result<StreakComputation, AppError> {
        let lookback_start = now - (STREAK_LOOKBACK_DAYS as i64) * MS_PER_DAY;
        let events = self
            .repo
            .activity_events_since(&user.user_id, lookback_start)
            .await?;

        let days = streak::consecutive_days(&events, now, self.day_boundary);
        let comp = streak::compute(user.streak_tier, user.streak_tier_reached, days, now);

        if let Some(transition) = comp.transition {
            self.repo
                .apply_streak_transition(&user.user_id, transition.tier, transition.reached)
                .await?;
        }

        Ok(comp)
    }
}
