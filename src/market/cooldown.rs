//! Sell-cooldown check over FIFO purchase lots.

use crate::domain::{PurchaseLot, SellCheck, TimeMs};

/// Decide whether `shares_to_sell` can be satisfied entirely by shares held
/// at least `cooldown_ms`.
///
/// Shares not covered by any lot (granted rather than bought, so their hold
/// time is unknown and predates tracking) count as aged. Tracked lots are
/// walked oldest-first, accumulating age-eligible shares; because lots arrive
/// pre-sorted by purchase time, the first lot still needed once the eligible
/// supply runs out is the oldest blocking lot, and its remaining hold time is
/// the reported wait.
pub fn check_fifo(
    lots: &[PurchaseLot],
    shares_to_sell: i64,
    total_shares_owned: i64,
    cooldown_ms: i64,
    now: TimeMs,
) -> SellCheck {
    let tracked: i64 = lots.iter().map(|lot| lot.shares).sum();
    let untracked = (total_shares_owned - tracked).max(0);

    let mut needed = shares_to_sell - untracked;

    for lot in lots {
        if needed <= 0 {
            break;
        }
        let age_ms = now.since(lot.time_ms);
        if age_ms >= cooldown_ms {
            needed -= lot.shares;
        } else {
            // Still need shares and the next FIFO lot is too young.
            return SellCheck::blocked(cooldown_ms - age_ms);
        }
    }

    SellCheck::allowed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, UserId, MS_PER_MINUTE};

    fn lot(id: i64, shares: i64, bought_at: TimeMs) -> PurchaseLot {
        PurchaseLot {
            id,
            buyer_id: UserId::new("buyer"),
            stock_user_id: UserId::new("stock"),
            shares,
            price: Decimal::hundred(),
            time_ms: bought_at,
        }
    }

    const COOLDOWN: i64 = 60 * MS_PER_MINUTE;

    #[test]
    fn test_lot_bought_30_minutes_ago_waits_30() {
        let now = TimeMs::new(10_000_000_000);
        let lots = vec![lot(1, 10, now - 30 * MS_PER_MINUTE)];

        let check = check_fifo(&lots, 10, 10, COOLDOWN, now);
        assert!(!check.can_sell);
        assert_eq!(check.wait_ms, Some(30 * MS_PER_MINUTE));
        assert_eq!(check.wait_minutes(), Some(30));
    }

    #[test]
    fn test_aged_lot_allows_sale() {
        let now = TimeMs::new(10_000_000_000);
        let lots = vec![lot(1, 10, now - 2 * COOLDOWN)];

        assert!(check_fifo(&lots, 10, 10, COOLDOWN, now).can_sell);
    }

    #[test]
    fn test_partial_sale_from_aged_lot_only() {
        let now = TimeMs::new(10_000_000_000);
        let lots = vec![
            lot(1, 5, now - 2 * COOLDOWN),
            lot(2, 5, now - 10 * MS_PER_MINUTE),
        ];

        // 5 shares are covered by the aged lot.
        assert!(check_fifo(&lots, 5, 10, COOLDOWN, now).can_sell);

        // 6 shares dip into the young lot, which has 50 minutes left.
        let check = check_fifo(&lots, 6, 10, COOLDOWN, now);
        assert!(!check.can_sell);
        assert_eq!(check.wait_ms, Some(50 * MS_PER_MINUTE));
    }

    #[test]
    fn test_wait_comes_from_oldest_blocking_lot() {
        let now = TimeMs::new(10_000_000_000);
        let lots = vec![
            lot(1, 5, now - 2 * COOLDOWN),
            lot(2, 5, now - 40 * MS_PER_MINUTE),
            lot(3, 5, now - 10 * MS_PER_MINUTE),
        ];

        // Needs the 40-minute-old lot, not the 10-minute-old one.
        let check = check_fifo(&lots, 8, 15, COOLDOWN, now);
        assert_eq!(check.wait_ms, Some(20 * MS_PER_MINUTE));
    }

    #[test]
    fn test_untracked_shares_have_no_cooldown() {
        let now = TimeMs::new(10_000_000_000);
        assert!(check_fifo(&[], 10, 10, COOLDOWN, now).can_sell);
    }

    #[test]
    fn test_untracked_shares_cover_young_lot() {
        let now = TimeMs::new(10_000_000_000);
        let lots = vec![lot(1, 5, now - 10 * MS_PER_MINUTE)];

        // Owns 12: 7 untracked + 5 in a young lot.
        assert!(check_fifo(&lots, 7, 12, COOLDOWN, now).can_sell);
        assert!(!check_fifo(&lots, 8, 12, COOLDOWN, now).can_sell);
    }
}
