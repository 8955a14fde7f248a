//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `users.rs` - User records, activity counters, streak persistence
//! - `activity.rs` - Activity event log
//! - `trading.rs` - Holdings, purchase lots, pending price impacts
//! - `settings.rs` - Per-guild settings and market events

mod activity;
mod settings;
mod trading;
mod users;

use crate::domain::Decimal;
use sqlx::sqlite::SqlitePool;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

/// Parse a stored canonical decimal, falling back to a default on corruption.
///
/// Decimals are stored as TEXT to avoid SQLite REAL drift; a row that fails to
/// parse is tolerated with a warning rather than failing the whole read.
pub(crate) fn parse_decimal(field: &str, raw: &str, fallback: Decimal) -> Decimal {
    Decimal::from_str_canonical(raw).unwrap_or_else(|e| {
        warn!(
            field = field,
            value = raw,
            error = %e,
            "Failed to parse stored decimal, using fallback"
        );
        fallback
    })
}
