//! Cached per-guild settings provider.
//!
//! The engine and market layer read settings through this provider rather
//! than holding their own caches; invalidation on admin update is this
//! provider's responsibility alone.

use crate::db::Repository;
use crate::domain::{ActivityTierSettings, GuildId, MarketSettings};
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

pub struct SettingsStore {
    repo: Arc<Repository>,
    market: RwLock<HashMap<GuildId, MarketSettings>>,
    tiers: RwLock<HashMap<GuildId, ActivityTierSettings>>,
}

impl SettingsStore {
    pub fn new(repo: Arc<Repository>) -> Self {
        SettingsStore {
            repo,
            market: RwLock::new(HashMap::new()),
            tiers: RwLock::new(HashMap::new()),
        }
    }

    /// Market-protection settings for a guild, creating the default row
    /// lazily on first read. `None` (no guild context) yields defaults.
    pub async fn market_settings(
        &self,
        guild_id: Option<&GuildId>,
    ) -> Result<MarketSettings, AppError> {
        let Some(guild_id) = guild_id else {
            return Ok(MarketSettings::default());
        };

        if let Ok(cache) = self.market.read() {
            if let Some(settings) = cache.get(guild_id) {
                return Ok(settings.clone());
            }
        }

        let settings = match self.repo.get_market_settings(guild_id).await? {
            Some(settings) => settings,
            None => {
                let defaults = MarketSettings::default();
                self.repo.put_market_settings(guild_id, &defaults).await?;
                info!(guild = %guild_id, "Created default market settings");
                defaults
            }
        };

        if let Ok(mut cache) = self.market.write() {
            cache.insert(guild_id.clone(), settings.clone());
        }
        Ok(settings)
    }

    /// Activity-tier settings for a guild, creating the default row lazily
    /// on first read. `None` (no guild context) yields defaults.
    pub async fn tier_settings(
        &self,
        guild_id: Option<&GuildId>,
    ) -> Result<ActivityTierSettings, AppError> {
        let Some(guild_id) = guild_id else {
            return Ok(ActivityTierSettings::default());
        };

        if let Ok(cache) = self.tiers.read() {
            if let Some(settings) = cache.get(guild_id) {
                return Ok(settings.clone());
            }
        }

        let settings = match self.repo.get_tier_settings(guild_id).await? {
            Some(settings) => settings,
            None => {
                let defaults = ActivityTierSettings::default();
                self.repo.put_tier_settings(guild_id, &defaults).await?;
                info!(guild = %guild_id, "Created default activity tier settings");
                defaults
            }
        };

        if let Ok(mut cache) = self.tiers.write() {
            cache.insert(guild_id.clone(), settings.clone());
        }
        Ok(settings)
    }

    /// Persist updated market settings and invalidate the cache entry.
    pub async fn update_market_settings(
        &self,
        guild_id: &GuildId,
        settings: &MarketSettings,
    ) -> Result<(), AppError> {
        self.repo.put_market_settings(guild_id, settings).await?;
        if let Ok(mut cache) = self.market.write() {
            cache.remove(guild_id);
        }
        Ok(())
    }

    /// Persist updated activity-tier settings and invalidate the cache entry.
    pub async fn update_tier_settings(
        &self,
        guild_id: &GuildId,
        settings: &ActivityTierSettings,
    ) -> Result<(), AppError> {
        self.repo.put_tier_settings(guild_id, settings).await?;
        if let Ok(mut cache) = self.tiers.write() {
            cache.remove(guild_id);
        }
        Ok(())
    }
}
