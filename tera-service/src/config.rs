use crate::services::lifecycle::{utc_offset, DEFAULT_UTC_OFFSET_HOURS};
use chrono::FixedOffset;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_RENEWAL_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct TeraConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Offset of the timezone whose calendar day decides expiry.
    pub utc_offset_hours: i32,
    /// Default look-ahead for the renewal queue.
    pub renewal_window_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            renewal_window_days: DEFAULT_RENEWAL_WINDOW_DAYS,
        }
    }
}

impl LifecycleConfig {
    pub fn timezone(&self) -> Result<FixedOffset, AppError> {
        self.validate()?;
        utc_offset(self.utc_offset_hours).map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TERA_UTC_OFFSET_HOURS must be between -12 and 14, got {}",
                self.utc_offset_hours
            )));
        }
        if self.renewal_window_days < 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TERA_RENEWAL_WINDOW_DAYS must not be negative, got {}",
                self.renewal_window_days
            )));
        }
        Ok(())
    }
}

impl TeraConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let default_offset = DEFAULT_UTC_OFFSET_HOURS.to_string();
        let default_window = DEFAULT_RENEWAL_WINDOW_DAYS.to_string();

        let lifecycle = LifecycleConfig {
            utc_offset_hours: parse_env(
                "TERA_UTC_OFFSET_HOURS",
                &get_env("TERA_UTC_OFFSET_HOURS", Some(&default_offset), is_prod)?,
            )?,
            renewal_window_days: parse_env(
                "TERA_RENEWAL_WINDOW_DAYS",
                &get_env("TERA_RENEWAL_WINDOW_DAYS", Some(&default_window), is_prod)?,
            )?,
        };
        lifecycle.validate()?;

        Ok(TeraConfig {
            common: common_config,
            lifecycle,
        })
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, value, e))
    })
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
