//! FIFO lot consumption and capital-gains tax.
//!
//! Both the sale path and the quote preview run through `plan_consumption`
//! and `assess`; the preview simply discards the plan's mutations, so the two
//! paths cannot diverge for the same input state.

use crate::domain::{
    ConsumedLot, Decimal, LotMutation, LotTax, MarketSettings, PurchaseLot, TaxAssessment, TimeMs,
    MS_PER_HOUR,
};

/// The outcome of a FIFO walk: the consumed sub-lots and the lot-table edits
/// that would realize them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionPlan {
    pub consumed: Vec<ConsumedLot>,
    pub mutations: Vec<LotMutation>,
}

/// Consume exactly `shares_to_sell` units oldest-first across `lots`.
///
/// Exhausted lots are deleted, a partially consumed lot is reduced in place.
/// If the lots run short (shares granted outside the purchase path), the
/// uncovered remainder simply has no cost basis and is not taxed.
pub fn plan_consumption(lots: &[PurchaseLot], shares_to_sell: i64) -> ConsumptionPlan {
    let mut consumed = Vec::new();
    let mut mutations = Vec::new();
    let mut remaining = shares_to_sell;

    for lot in lots {
        if remaining <= 0 {
            break;
        }

        if lot.shares <= remaining {
            consumed.push(ConsumedLot {
                shares: lot.shares,
                price: lot.price,
                time_ms: lot.time_ms,
            });
            mutations.push(LotMutation::Delete { lot_id: lot.id });
            remaining -= lot.shares;
        } else {
            consumed.push(ConsumedLot {
                shares: remaining,
                price: lot.price,
                time_ms: lot.time_ms,
            });
            mutations.push(LotMutation::Reduce {
                lot_id: lot.id,
                remaining_shares: lot.shares - remaining,
            });
            remaining = 0;
        }
    }

    ConsumptionPlan {
        consumed,
        mutations,
    }
}

/// Compute capital-gains tax on consumed lots at `sale_price`.
///
/// Per lot: gain below zero is not taxed and never offsets other lots; the
/// rate is the short-term one while the lot's hold duration is under the
/// threshold; tax rounds to whole currency units. Disabled settings yield a
/// zero assessment with an empty breakdown.
pub fn assess(
    consumed: &[ConsumedLot],
    sale_price: Decimal,
    settings: &MarketSettings,
    now: TimeMs,
) -> TaxAssessment {
    if !settings.capital_gains_enabled {
        return TaxAssessment::none();
    }

    let threshold_ms = settings.short_term_threshold_hours * MS_PER_HOUR;
    let mut total_tax = Decimal::zero();
    let mut breakdown = Vec::with_capacity(consumed.len());

    for lot in consumed {
        let gain = ((sale_price - lot.price) * Decimal::from_i64(lot.shares)).max(Decimal::zero());
        let short_term = now.since(lot.time_ms) < threshold_ms;
        let rate = if short_term {
            settings.short_term_tax_percent
        } else {
            settings.long_term_tax_percent
        };
        let tax = (gain * rate / Decimal::hundred()).round_units();

        total_tax = total_tax + tax;
        breakdown.push(LotTax {
            shares: lot.shares,
            gain,
            tax,
            short_term,
        });
    }

    TaxAssessment {
        total_tax,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UserId, MS_PER_DAY};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn lot(id: i64, shares: i64, price: &str, time_ms: i64) -> PurchaseLot {
        PurchaseLot {
            id,
            buyer_id: UserId::new("buyer"),
            stock_user_id: UserId::new("stock"),
            shares,
            price: d(price),
            time_ms: TimeMs::new(time_ms),
        }
    }

    #[test]
    fn test_plan_consumes_oldest_first() {
        let lots = vec![lot(1, 5, "100", 1000), lot(2, 5, "120", 2000)];
        let plan = plan_consumption(&lots, 7);

        assert_eq!(plan.consumed.len(), 2);
        assert_eq!(plan.consumed[0].shares, 5);
        assert_eq!(plan.consumed[0].price, d("100"));
        assert_eq!(plan.consumed[1].shares, 2);
        assert_eq!(plan.consumed[1].price, d("120"));

        assert_eq!(
            plan.mutations,
            vec![
                LotMutation::Delete { lot_id: 1 },
                LotMutation::Reduce {
                    lot_id: 2,
                    remaining_shares: 3
                },
            ]
        );
    }

    #[test]
    fn test_plan_exact_lot_boundary_deletes() {
        let lots = vec![lot(1, 5, "100", 1000)];
        let plan = plan_consumption(&lots, 5);
        assert_eq!(plan.mutations, vec![LotMutation::Delete { lot_id: 1 }]);
    }

    #[test]
    fn test_plan_short_lots_leaves_remainder_unconsumed() {
        let lots = vec![lot(1, 3, "100", 1000)];
        let plan = plan_consumption(&lots, 10);
        assert_eq!(plan.consumed.len(), 1);
        assert_eq!(plan.consumed[0].shares, 3);
    }

    #[test]
    fn test_short_term_rate_applies_under_threshold() {
        let settings = MarketSettings::default(); // 24h boundary, 25%/0%
        let now = TimeMs::new(100 * MS_PER_DAY);
        let consumed = vec![ConsumedLot {
            shares: 10,
            price: d("100"),
            time_ms: now - MS_PER_HOUR, // held 1h
        }];

        let assessment = assess(&consumed, d("140"), &settings, now);
        // gain 400, short-term 25% => 100
        assert_eq!(assessment.total_tax, d("100"));
        assert!(assessment.breakdown[0].short_term);
    }

    #[test]
    fn test_long_term_rate_applies_past_threshold() {
        let mut settings = MarketSettings::default();
        settings.long_term_tax_percent = d("10");
        let now = TimeMs::new(100 * MS_PER_DAY);
        let consumed = vec![ConsumedLot {
            shares: 10,
            price: d("100"),
            time_ms: now - 48 * MS_PER_HOUR,
        }];

        let assessment = assess(&consumed, d("140"), &settings, now);
        // gain 400, long-term 10% => 40
        assert_eq!(assessment.total_tax, d("40"));
        assert!(!assessment.breakdown[0].short_term);
    }

    #[test]
    fn test_exactly_at_threshold_is_long_term() {
        let settings = MarketSettings::default();
        let now = TimeMs::new(100 * MS_PER_DAY);
        let consumed = vec![ConsumedLot {
            shares: 1,
            price: d("100"),
            time_ms: now - 24 * MS_PER_HOUR,
        }];

        let assessment = assess(&consumed, d("200"), &settings, now);
        assert!(!assessment.breakdown[0].short_term);
        assert_eq!(assessment.total_tax, Decimal::zero());
    }

    #[test]
    fn test_losses_are_not_taxed_and_do_not_offset() {
        let settings = MarketSettings::default();
        let now = TimeMs::new(100 * MS_PER_DAY);
        let consumed = vec![
            ConsumedLot {
                shares: 10,
                price: d("200"), // underwater
                time_ms: now - MS_PER_HOUR,
            },
            ConsumedLot {
                shares: 10,
                price: d("100"), // gain 400
                time_ms: now - MS_PER_HOUR,
            },
        ];

        let assessment = assess(&consumed, d("140"), &settings, now);
        assert_eq!(assessment.breakdown[0].tax, Decimal::zero());
        assert_eq!(assessment.breakdown[0].gain, Decimal::zero());
        assert_eq!(assessment.total_tax, d("100"));
    }

    #[test]
    fn test_disabled_tax_returns_empty_assessment() {
        let mut settings = MarketSettings::default();
        settings.capital_gains_enabled = false;
        let now = TimeMs::new(100 * MS_PER_DAY);
        let consumed = vec![ConsumedLot {
            shares: 10,
            price: d("100"),
            time_ms: now - MS_PER_HOUR,
        }];

        let assessment = assess(&consumed, d("999"), &settings, now);
        assert_eq!(assessment, TaxAssessment::none());
    }

    #[test]
    fn test_tax_rounds_to_whole_units() {
        let settings = MarketSettings::default();
        let now = TimeMs::new(100 * MS_PER_DAY);
        let consumed = vec![ConsumedLot {
            shares: 1,
            price: d("100"),
            time_ms: now - MS_PER_HOUR,
        }];

        // gain 1.99, 25% => 0.4975 => rounds to 0
        let assessment = assess(&consumed, d("101.99"), &settings, now);
        assert_eq!(assessment.total_tax, Decimal::zero());

        // gain 2.01, 25% => 0.5025 => rounds to 1
        let assessment = assess(&consumed, d("102.01"), &settings, now);
        assert_eq!(assessment.total_tax, d("1"));
    }
}
