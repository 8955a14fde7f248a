pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod market;
pub mod settings;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    ActivityTierSettings, ConsumedLot, Decimal, GuildId, MarketEvent, MarketSettings,
    PendingImpact, PurchaseLot, SellCheck, StockUser, TaxAssessment, TimeMs, UserId,
};
pub use engine::{MarketEventSource, RepoMarketEvents, StreakInfo, ValuationEngine};
pub use error::AppError;
pub use market::{MarketProtection, ShareSupplySource};
pub use settings::SettingsStore;

/// Install the default tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to INFO. Safe to call more than once; later
/// calls are no-ops, so tests and embedding applications can both use it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .try_init();
}
