use chrono::FixedOffset;
use std::collections::HashMap;
use thiserror::Error;

/// Runtime configuration loaded from the environment.
///
/// The day-boundary offset is the timezone policy for calendar-day bucketing
/// (activity tiers and streaks). It is explicit configuration rather than the
/// host's local time so two deployments never disagree about day boundaries.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub day_boundary: FixedOffset,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let offset_hours = env_map
            .get("DAY_BOUNDARY_OFFSET_HOURS")
            .map(|s| s.as_str())
            .unwrap_or("0")
            .parse::<i32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DAY_BOUNDARY_OFFSET_HOURS".to_string(),
                    "must be a valid integer".to_string(),
                )
            })?;

        if !(-12..=14).contains(&offset_hours) {
            return Err(ConfigError::InvalidValue(
                "DAY_BOUNDARY_OFFSET_HOURS".to_string(),
                format!("must be between -12 and 14, got {}", offset_hours),
            ));
        }

        let day_boundary = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            ConfigError::InvalidValue(
                "DAY_BOUNDARY_OFFSET_HOURS".to_string(),
                format!("not a representable offset: {}", offset_hours),
            )
        })?;

        Ok(Config {
            database_path,
            day_boundary,
        })
    }
}
