//! Trading-side records: users, purchase lots, pending price impacts,
//! sell-check verdicts, and tax assessments.

use super::{Decimal, GuildId, TimeMs, UserId, MS_PER_MINUTE};
use serde::{Deserialize, Serialize};

/// One trader / stock issuer.
///
/// `base_value` only grows with activity or is rescaled by splits; inactivity
/// decay applies to the computed price, never to this stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUser {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub username: String,
    pub total_messages: i64,
    pub base_value: Decimal,
    pub last_message_time: TimeMs,
    pub price_modifier: Decimal,
    pub streak_tier: u8,
    /// When tier 3 was first reached; 0 when not at tier 3.
    pub streak_tier_reached: TimeMs,
}

impl StockUser {
    /// A fresh user record with the starting base value of 100.
    pub fn new(user_id: UserId, guild_id: GuildId, username: impl Into<String>) -> Self {
        StockUser {
            user_id,
            guild_id,
            username: username.into(),
            total_messages: 0,
            base_value: Decimal::hundred(),
            last_message_time: TimeMs::new(0),
            price_modifier: Decimal::one(),
            streak_tier: 0,
            streak_tier_reached: TimeMs::new(0),
        }
    }
}

/// An un-consumed batch of shares bought at one price and time.
///
/// Lots are never merged; per-lot aging drives both the sell cooldown and
/// short/long-term tax classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLot {
    pub id: i64,
    pub buyer_id: UserId,
    pub stock_user_id: UserId,
    pub shares: i64,
    pub price: Decimal,
    pub time_ms: TimeMs,
}

/// A sub-lot consumed by a sale, carrying its original cost basis and age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedLot {
    pub shares: i64,
    pub price: Decimal,
    pub time_ms: TimeMs,
}

/// An edit to the lot table produced by a FIFO consumption plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotMutation {
    Delete { lot_id: i64 },
    Reduce { lot_id: i64, remaining_shares: i64 },
}

/// A share-count change phasing into the demand multiplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImpact {
    pub id: i64,
    pub stock_user_id: UserId,
    /// Positive for buys, negative for sells.
    pub shares_delta: i64,
    pub time_ms: TimeMs,
    pub fully_applied: bool,
}

/// Why a sale was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellBlockReason {
    CooldownActive,
}

/// Verdict of a sell-cooldown check.
///
/// `wait_ms` is the raw remaining hold time of the blocking lot; formatting
/// into human-readable text is the presentation layer's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellCheck {
    pub can_sell: bool,
    pub reason: Option<SellBlockReason>,
    pub wait_ms: Option<i64>,
}

impl SellCheck {
    pub fn allowed() -> Self {
        SellCheck {
            can_sell: true,
            reason: None,
            wait_ms: None,
        }
    }

    pub fn blocked(wait_ms: i64) -> Self {
        SellCheck {
            can_sell: false,
            reason: Some(SellBlockReason::CooldownActive),
            wait_ms: Some(wait_ms),
        }
    }

    /// Remaining wait rounded up to whole minutes, for display.
    pub fn wait_minutes(&self) -> Option<i64> {
        self.wait_ms.map(|ms| (ms + MS_PER_MINUTE - 1) / MS_PER_MINUTE)
    }
}

/// Tax owed on one consumed lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotTax {
    pub shares: i64,
    pub gain: Decimal,
    pub tax: Decimal,
    pub short_term: bool,
}

/// Total capital-gains tax for a sale, with the per-lot breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub total_tax: Decimal,
    pub breakdown: Vec<LotTax>,
}

impl TaxAssessment {
    pub fn none() -> Self {
        TaxAssessment {
            total_tax: Decimal::zero(),
            breakdown: Vec::new(),
        }
    }
}

/// A guild-global, time-boxed price event (owned by the events collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub multiplier: Decimal,
    pub percent_change: Decimal,
    pub expires_at: TimeMs,
    pub event_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = StockUser::new(UserId::new("u1"), GuildId::new("g1"), "alice");
        assert_eq!(user.base_value, Decimal::hundred());
        assert_eq!(user.price_modifier, Decimal::one());
        assert_eq!(user.streak_tier, 0);
        assert_eq!(user.total_messages, 0);
    }

    #[test]
    fn test_sell_check_wait_minutes_rounds_up() {
        let check = SellCheck::blocked(30 * MS_PER_MINUTE);
        assert_eq!(check.wait_minutes(), Some(30));

        let check = SellCheck::blocked(30 * MS_PER_MINUTE + 1);
        assert_eq!(check.wait_minutes(), Some(31));

        assert_eq!(SellCheck::allowed().wait_minutes(), None);
    }
}
