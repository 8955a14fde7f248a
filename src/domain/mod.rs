//! Core domain types shared by the valuation engine and market layer.

pub mod decimal;
pub mod primitives;
pub mod settings;
pub mod trade;

pub use decimal::Decimal;
pub use primitives::{GuildId, TimeMs, UserId, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE};
pub use settings::{ActivityTierSettings, MarketSettings, TierBand};
pub use trade::{
    ConsumedLot, LotMutation, LotTax, MarketEvent, PendingImpact, PurchaseLot, SellBlockReason,
    SellCheck, StockUser, TaxAssessment,
};
