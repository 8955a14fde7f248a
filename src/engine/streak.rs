//! Consecutive-day streak computation and tier transitions.
//!
//! The streak read is pure; persistence of a tier change is a separate,
//! explicit step (`Repository::apply_streak_transition`) driven by the
//! `transition` field, so reads and writes are never silently coupled.

use super::activity::day_key;
use crate::domain::{Decimal, TimeMs, MS_PER_DAY};
use chrono::FixedOffset;
use std::collections::HashSet;

/// Days scanned backward when reconstructing a streak.
pub const STREAK_LOOKBACK_DAYS: u32 = 60;

/// Tier-3 bonus lapses this long after the tier was first reached.
pub const TIER3_EXPIRY_MS: i64 = 7 * MS_PER_DAY;

/// Consecutive calendar days with activity, ending today.
///
/// Today may still be empty (a user who hasn't posted yet keeps yesterday's
/// streak), but any earlier gap breaks the chain.
pub fn consecutive_days(events: &[TimeMs], now: TimeMs, boundary: FixedOffset) -> u32 {
    let active_days: HashSet<_> = events.iter().map(|t| day_key(*t, boundary)).collect();
    let today = day_key(now, boundary);

    let mut cursor = if active_days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(day) => day,
            None => return 0,
        }
    };

    let mut days = 0u32;
    while days < STREAK_LOOKBACK_DAYS && active_days.contains(&cursor) {
        days += 1;
        cursor = match cursor.pred_opt() {
            Some(day) => day,
            None => break,
        };
    }
    days
}

/// Map a streak length to its tier.
pub fn tier_for_days(days: u32) -> u8 {
    match days {
        d if d >= 30 => 3,
        d if d >= 14 => 2,
        d if d >= 7 => 1,
        _ => 0,
    }
}

/// Price bonus fraction for a tier.
pub fn bonus_for_tier(tier: u8) -> Decimal {
    match tier {
        3 => Decimal::new_scaled(7, 2),
        2 => Decimal::new_scaled(4, 2),
        1 => Decimal::new_scaled(2, 2),
        _ => Decimal::zero(),
    }
}

/// A pending write to the persisted streak state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakTransition {
    pub tier: u8,
    /// Stamped with `now` only when tier 3 is newly reached; otherwise the
    /// prior value, or 0 on demotion/expiry.
    pub reached: TimeMs,
}

/// Result of a streak evaluation against the stored tier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakComputation {
    pub days: u32,
    pub tier: u8,
    pub bonus: Decimal,
    /// The tier just increased; callers may announce it.
    pub new_tier: bool,
    /// The tier-3 bonus just lapsed; callers may notify the user.
    pub expired: bool,
    pub transition: Option<StreakTransition>,
}

/// Evaluate the streak against stored state.
///
/// Expiration: a user still at tier 3 whose stored tier is already 3 loses
/// the bonus once more than seven days have passed since the tier was
/// reached. The reset clears the stored tier, so a still-running streak
/// re-promotes on the following evaluation with a fresh timestamp.
pub fn compute(
    stored_tier: u8,
    stored_reached: TimeMs,
    days: u32,
    now: TimeMs,
) -> StreakComputation {
    let observed = tier_for_days(days);

    if observed == 3
        && stored_tier == 3
        && stored_reached.as_i64() > 0
        && now.since(stored_reached) > TIER3_EXPIRY_MS
    {
        return StreakComputation {
            days,
            tier: 0,
            bonus: Decimal::zero(),
            new_tier: false,
            expired: true,
            transition: Some(StreakTransition {
                tier: 0,
                reached: TimeMs::new(0),
            }),
        };
    }

    let transition = if observed > stored_tier {
        Some(StreakTransition {
            tier: observed,
            reached: if observed == 3 { now } else { stored_reached },
        })
    } else if observed < stored_tier {
        Some(StreakTransition {
            tier: observed,
            reached: TimeMs::new(0),
        })
    } else {
        None
    };

    StreakComputation {
        days,
        tier: observed,
        bonus: bonus_for_tier(observed),
        new_tier: observed > stored_tier,
        expired: false,
        transition,
    }
}
