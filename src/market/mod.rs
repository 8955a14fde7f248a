//! Market protection layer: sell cooldowns, delayed price impact, and
//! capital-gains tax lots.
//!
//! This layer guards the valuation engine's share-count input and a trader's
//! realized gains against fast manipulation. It is a leaf: the valuation
//! engine consumes it through the `ShareSupplySource` trait, and nothing here
//! calls back into the engine.

pub mod cooldown;
pub mod tax;

use crate::db::Repository;
use crate::domain::{
    ConsumedLot, Decimal, GuildId, PendingImpact, SellCheck, TaxAssessment, TimeMs, UserId,
};
use crate::error::AppError;
use crate::settings::SettingsStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use tax::ConsumptionPlan;

/// Provider of the demand multiplier's share-count input.
///
/// The valuation engine holds this as its only view into the market layer.
#[async_trait]
pub trait ShareSupplySource: Send + Sync {
    /// The share count the demand multiplier should see, with recent trades
    /// phased in.
    async fn effective_count(
        &self,
        guild_id: &GuildId,
        stock_user_id: &UserId,
        actual_shares: i64,
        now: TimeMs,
    ) -> Result<i64, AppError>;
}

/// Reduce `actual` by the still-phasing-in portion of each pending impact.
///
/// A buy's positive delta hasn't fully "happened" yet for pricing, so its
/// unapplied remainder `delta * (1 - elapsed/delay)` is subtracted; a sell's
/// negative delta symmetrically keeps shares partially present. Returns the
/// effective count and the ids of rows at or past the full window, which
/// contribute zero and can be flagged.
pub fn effective_after_impacts(
    actual: i64,
    impacts: &[PendingImpact],
    delay_ms: i64,
    now: TimeMs,
) -> (i64, Vec<i64>) {
    if delay_ms <= 0 {
        return (actual, impacts.iter().map(|i| i.id).collect());
    }

    let mut resolved = Vec::new();
    let mut remainder = Decimal::zero();

    for impact in impacts {
        let elapsed = now.since(impact.time_ms);
        if elapsed >= delay_ms {
            resolved.push(impact.id);
            continue;
        }
        let fraction = Decimal::from_i64(elapsed.max(0)) / Decimal::from_i64(delay_ms);
        remainder =
            remainder + Decimal::from_i64(impact.shares_delta) * (Decimal::one() - fraction);
    }

    let effective = (Decimal::from_i64(actual) - remainder).round_units().to_i64();
    (effective, resolved)
}

/// Repo-backed market protection operations.
pub struct MarketProtection {
    repo: Arc<Repository>,
    settings: Arc<SettingsStore>,
}

impl MarketProtection {
    pub fn new(repo: Arc<Repository>, settings: Arc<SettingsStore>) -> Self {
        MarketProtection { repo, settings }
    }

    /// The demand multiplier's share count with pending impacts phased in.
    /// Returns `actual_shares` unmodified when the protection is disabled.
    pub async fn effective_share_count(
        &self,
        guild_id: &GuildId,
        stock_user_id: &UserId,
        actual_shares: i64,
        now: TimeMs,
    ) -> Result<i64, AppError> {
        let settings = self.settings.market_settings(Some(guild_id)).await?;
        if !settings.price_impact_enabled {
            return Ok(actual_shares);
        }

        let impacts = self.repo.unapplied_impacts(stock_user_id).await?;
        let (effective, resolved) =
            effective_after_impacts(actual_shares, &impacts, settings.price_impact_delay_ms(), now);

        if !resolved.is_empty() {
            self.repo.mark_impacts_applied(&resolved).await?;
        }

        Ok(effective)
    }

    /// Can `shares_to_sell` be sold now, given the buyer's lot ages?
    pub async fn check_sell_cooldown(
        &self,
        guild_id: &GuildId,
        buyer_id: &UserId,
        stock_user_id: &UserId,
        shares_to_sell: i64,
        total_shares_owned: i64,
        now: TimeMs,
    ) -> Result<SellCheck, AppError> {
        let settings = self.settings.market_settings(Some(guild_id)).await?;
        if !settings.sell_cooldown_enabled {
            return Ok(SellCheck::allowed());
        }

        let lots = self.repo.purchase_lots(buyer_id, stock_user_id).await?;
        Ok(cooldown::check_fifo(
            &lots,
            shares_to_sell,
            total_shares_owned,
            settings.sell_cooldown_ms(),
            now,
        ))
    }

    /// Record a buy as a new lot. Lots never merge; per-lot aging drives both
    /// the cooldown and tax classification.
    pub async fn record_purchase(
        &self,
        buyer_id: &UserId,
        stock_user_id: &UserId,
        shares: i64,
        price: Decimal,
        now: TimeMs,
    ) -> Result<(), AppError> {
        self.repo
            .insert_purchase_lot(buyer_id, stock_user_id, shares, price, now)
            .await?;
        Ok(())
    }

    /// Record a trade's signed share delta for phased price impact.
    pub async fn record_price_impact(
        &self,
        stock_user_id: &UserId,
        shares_delta: i64,
        now: TimeMs,
    ) -> Result<(), AppError> {
        self.repo
            .insert_pending_impact(stock_user_id, shares_delta, now)
            .await?;
        Ok(())
    }

    /// FIFO-consume `shares_to_sell` from the buyer's lots, applying the
    /// reductions and deletions atomically. The returned sub-lots feed the
    /// tax computation. Consumption happens even when tax is disabled; it is
    /// share accounting, not just tax input.
    pub async fn consume_purchase_shares(
        &self,
        buyer_id: &UserId,
        stock_user_id: &UserId,
        shares_to_sell: i64,
    ) -> Result<Vec<ConsumedLot>, AppError> {
        let lots = self.repo.purchase_lots(buyer_id, stock_user_id).await?;
        let plan = tax::plan_consumption(&lots, shares_to_sell);

        debug!(
            buyer = %buyer_id,
            stock = %stock_user_id,
            shares = shares_to_sell,
            lots_touched = plan.mutations.len(),
            "Consuming purchase lots"
        );

        self.repo.apply_lot_mutations(&plan.mutations).await?;
        Ok(plan.consumed)
    }

    /// Tax on an actual sale, from the lots it consumed.
    pub async fn calculate_capital_gains_tax(
        &self,
        guild_id: &GuildId,
        consumed: &[ConsumedLot],
        sale_price: Decimal,
        now: TimeMs,
    ) -> Result<TaxAssessment, AppError> {
        let settings = self.settings.market_settings(Some(guild_id)).await?;
        Ok(tax::assess(consumed, sale_price, &settings, now))
    }

    /// Tax quote for a prospective sale, without touching the lot table.
    ///
    /// Runs the same FIFO walk as `consume_purchase_shares` and discards the
    /// mutations, so for unchanged state it equals the actual-sale number.
    pub async fn preview_capital_gains_tax(
        &self,
        guild_id: &GuildId,
        buyer_id: &UserId,
        stock_user_id: &UserId,
        shares_to_sell: i64,
        sale_price: Decimal,
        now: TimeMs,
    ) -> Result<TaxAssessment, AppError> {
        let settings = self.settings.market_settings(Some(guild_id)).await?;
        let lots = self.repo.purchase_lots(buyer_id, stock_user_id).await?;
        let plan = tax::plan_consumption(&lots, shares_to_sell);
        Ok(tax::assess(&plan.consumed, sale_price, &settings, now))
    }
}

#[async_trait]
impl ShareSupplySource for MarketProtection {
    async fn effective_count(
        &self,
        guild_id: &GuildId,
        stock_user_id: &UserId,
        actual_shares: i64,
        now: TimeMs,
    ) -> Result<i64, AppError> {
        self.effective_share_count(guild_id, stock_user_id, actual_shares, now)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MS_PER_MINUTE;

    fn impact(id: i64, delta: i64, at: TimeMs) -> PendingImpact {
        PendingImpact {
            id,
            stock_user_id: UserId::new("stock"),
            shares_delta: delta,
            time_ms: at,
            fully_applied: false,
        }
    }

    const DELAY: i64 = 120 * MS_PER_MINUTE;

    #[test]
    fn test_fresh_buy_fully_discounted() {
        let now = TimeMs::new(10_000_000_000);
        let impacts = vec![impact(1, 100, now)];

        let (effective, resolved) = effective_after_impacts(500, &impacts, DELAY, now);
        assert_eq!(effective, 400);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_half_elapsed_buy_half_counted() {
        let now = TimeMs::new(10_000_000_000);
        let impacts = vec![impact(1, 100, now - DELAY / 2)];

        let (effective, _) = effective_after_impacts(500, &impacts, DELAY, now);
        assert_eq!(effective, 450);
    }

    #[test]
    fn test_past_window_counts_fully_and_resolves() {
        let now = TimeMs::new(10_000_000_000);
        let impacts = vec![impact(1, 100, now - DELAY)];

        let (effective, resolved) = effective_after_impacts(500, &impacts, DELAY, now);
        assert_eq!(effective, 500);
        assert_eq!(resolved, vec![1]);
    }

    #[test]
    fn test_sell_delta_keeps_shares_partially_present() {
        let now = TimeMs::new(10_000_000_000);
        let impacts = vec![impact(1, -100, now - DELAY / 4)];

        // 75% of the sold shares still count as present.
        let (effective, _) = effective_after_impacts(400, &impacts, DELAY, now);
        assert_eq!(effective, 475);
    }

    #[test]
    fn test_independent_phasing_of_multiple_trades() {
        let now = TimeMs::new(10_000_000_000);
        let impacts = vec![
            impact(1, 100, now - DELAY / 2),
            impact(2, 100, now - DELAY / 4),
        ];

        // Remainders: 50 + 75.
        let (effective, _) = effective_after_impacts(500, &impacts, DELAY, now);
        assert_eq!(effective, 375);
    }

    #[test]
    fn test_effective_count_bounds() {
        let now = TimeMs::new(10_000_000_000);
        let impacts = vec![
            impact(1, 80, now - DELAY / 3),
            impact(2, -40, now - DELAY / 5),
        ];

        let (effective, _) = effective_after_impacts(200, &impacts, DELAY, now);
        assert!(effective >= 200 - 80);
        assert!(effective <= 200 + 40);
    }

    #[test]
    fn test_zero_delay_applies_everything() {
        let now = TimeMs::new(10_000_000_000);
        let impacts = vec![impact(1, 100, now)];

        let (effective, resolved) = effective_after_impacts(500, &impacts, 0, now);
        assert_eq!(effective, 500);
        assert_eq!(resolved, vec![1]);
    }
}
