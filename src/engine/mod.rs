//! Valuation engine: deterministic pricing over persisted state.

pub mod activity;
pub mod streak;
pub mod valuation;

use crate::db::Repository;
use crate::domain::{Decimal, GuildId, TimeMs};
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

pub use streak::{StreakComputation, StreakTransition};
pub use valuation::ValuationEngine;

/// Streak state reported to callers (for announcements and profile embeds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakInfo {
    pub days: u32,
    pub tier: u8,
    pub bonus: Decimal,
    /// The tier increased during this evaluation.
    pub new_tier: bool,
    /// The tier-3 bonus lapsed during this evaluation.
    pub expired: bool,
}

/// Source of the guild-global market-event multiplier.
///
/// Owned by the events collaborator; the engine treats `None` as 1.0.
#[async_trait]
pub trait MarketEventSource: Send + Sync {
    async fn active_multiplier(
        &self,
        guild_id: &GuildId,
        now: TimeMs,
    ) -> Result<Option<Decimal>, AppError>;
}

/// Market events read from the persisted backup table, with expiry filtering.
pub struct RepoMarketEvents {
    repo: Arc<Repository>,
}

impl RepoMarketEvents {
    pub fn new(repo: Arc<Repository>) -> Self {
        RepoMarketEvents { repo }
    }
}

#[async_trait]
impl MarketEventSource for RepoMarketEvents {
    async fn active_multiplier(
        &self,
        guild_id: &GuildId,
        now: TimeMs,
    ) -> Result<Option<Decimal>, AppError> {
        let event = self.repo.active_market_event(guild_id, now).await?;
        Ok(event.map(|e| e.multiplier))
    }
}
