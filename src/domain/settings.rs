//! Per-guild configuration for activity pricing and market protection.
//!
//! Every guild gets the documented defaults until an admin changes them; a
//! missing settings row never blocks pricing.

use super::{Decimal, MS_PER_MINUTE};
use serde::{Deserialize, Serialize};

/// One marginal-rate band of the tiered activity schedule.
///
/// `max_messages` is the inclusive upper bound of the band's daily message
/// range; `None` marks the open-ended final band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBand {
    pub max_messages: Option<i64>,
    /// Percent contribution per message falling inside this band.
    pub rate_percent: Decimal,
}

/// Activity-multiplier settings for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTierSettings {
    /// Tiered marginal schedule when true; legacy flat 0.2%/msg (capped at
    /// 60%) when false.
    pub tiered_enabled: bool,
    /// Rolling lookback window, in days, for the activity multiplier.
    pub window_days: i64,
    pub bands: [TierBand; 4],
}

impl Default for ActivityTierSettings {
    fn default() -> Self {
        ActivityTierSettings {
            tiered_enabled: true,
            window_days: 15,
            bands: [
                TierBand {
                    max_messages: Some(20),
                    rate_percent: Decimal::new_scaled(5, 1), // 0.5%/msg
                },
                TierBand {
                    max_messages: Some(50),
                    rate_percent: Decimal::new_scaled(25, 2), // 0.25%/msg
                },
                TierBand {
                    max_messages: Some(100),
                    rate_percent: Decimal::new_scaled(15, 2), // 0.15%/msg
                },
                TierBand {
                    max_messages: None,
                    rate_percent: Decimal::new_scaled(5, 2), // 0.05%/msg, uncapped
                },
            ],
        }
    }
}

/// Market-protection settings for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSettings {
    pub sell_cooldown_minutes: i64,
    pub sell_cooldown_enabled: bool,
    pub price_impact_delay_minutes: i64,
    pub price_impact_enabled: bool,
    pub short_term_threshold_hours: i64,
    pub short_term_tax_percent: Decimal,
    pub long_term_tax_percent: Decimal,
    pub capital_gains_enabled: bool,
}

impl Default for MarketSettings {
    fn default() -> Self {
        MarketSettings {
            sell_cooldown_minutes: 60,
            sell_cooldown_enabled: true,
            price_impact_delay_minutes: 120,
            price_impact_enabled: true,
            short_term_threshold_hours: 24,
            short_term_tax_percent: Decimal::from_i64(25),
            long_term_tax_percent: Decimal::zero(),
            capital_gains_enabled: true,
        }
    }
}

impl MarketSettings {
    pub fn sell_cooldown_ms(&self) -> i64 {
        self.sell_cooldown_minutes * MS_PER_MINUTE
    }

    pub fn price_impact_delay_ms(&self) -> i64 {
        self.price_impact_delay_minutes * MS_PER_MINUTE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tier_bands() {
        let s = ActivityTierSettings::default();
        assert!(s.tiered_enabled);
        assert_eq!(s.window_days, 15);
        assert_eq!(s.bands[0].max_messages, Some(20));
        assert_eq!(s.bands[3].max_messages, None);
        assert_eq!(s.bands[0].rate_percent, Decimal::new_scaled(5, 1));
    }

    #[test]
    fn test_default_market_settings() {
        let s = MarketSettings::default();
        assert_eq!(s.sell_cooldown_ms(), 60 * 60_000);
        assert_eq!(s.price_impact_delay_ms(), 120 * 60_000);
        assert_eq!(s.short_term_threshold_hours, 24);
        assert_eq!(s.short_term_tax_percent, Decimal::from_i64(25));
        assert!(s.long_term_tax_percent.is_zero());
        assert!(s.capital_gains_enabled);
    }
}
