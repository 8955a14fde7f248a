//! Activity multiplier: calendar-day bucketing and the tiered marginal
//! schedule.
//!
//! Day keys come from an explicit `FixedOffset` boundary policy, not the host
//! timezone; streaks and tier boundaries must agree across deployments.

use crate::domain::{ActivityTierSettings, Decimal, TimeMs};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Calendar date of a timestamp under the configured day boundary.
pub fn day_key(t: TimeMs, boundary: FixedOffset) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(t.as_i64())
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&boundary)
        .date_naive()
}

/// Count events per calendar day.
pub fn bucket_by_day(events: &[TimeMs], boundary: FixedOffset) -> BTreeMap<NaiveDate, i64> {
    let mut days = BTreeMap::new();
    for event in events {
        *days.entry(day_key(*event, boundary)).or_insert(0) += 1;
    }
    days
}

/// Percent contribution of one day's message count under the marginal tier
/// schedule: each band's rate applies only to the messages falling in that
/// band's range. The final band is open-ended, so contribution keeps growing
/// for arbitrarily active days.
pub fn tiered_day_percent(day_count: i64, settings: &ActivityTierSettings) -> Decimal {
    let mut remaining = day_count.max(0);
    let mut band_floor = 0i64;
    let mut percent = Decimal::zero();

    for band in &settings.bands {
        if remaining <= 0 {
            break;
        }
        let in_band = match band.max_messages {
            Some(max) => remaining.min((max - band_floor).max(0)),
            None => remaining,
        };
        percent = percent + Decimal::from_i64(in_band) * band.rate_percent;
        remaining -= in_band;
        if let Some(max) = band.max_messages {
            band_floor = max;
        }
    }

    percent
}

/// Legacy flat mode: 0.2% per message, hard-capped at +60%.
pub fn legacy_multiplier(message_count: i64) -> Decimal {
    let contribution = (Decimal::from_i64(message_count.max(0)) * Decimal::new_scaled(2, 3))
        .min(Decimal::new_scaled(6, 1));
    Decimal::one() + contribution
}

/// Activity multiplier over the events inside the lookback window.
///
/// Callers pass events already filtered to the window; each day contributes
/// independently and the per-day percentages sum.
pub fn multiplier(
    events: &[TimeMs],
    settings: &ActivityTierSettings,
    boundary: FixedOffset,
) -> Decimal {
    if !settings.tiered_enabled {
        return legacy_multiplier(events.len() as i64);
    }

    let days = bucket_by_day(events, boundary);
    let total_percent = days
        .values()
        .fold(Decimal::zero(), |acc, &count| {
            acc + tiered_day_percent(count, settings)
        });

    Decimal::one() + total_percent / Decimal::hundred()
}
