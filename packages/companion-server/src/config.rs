//! Application configuration loaded from environment variables (§6.4).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be valid: {e}")),
        Err(_) => Ok(default),
    }
}

/// Application configuration loaded from environment variables. See
/// spec.md §6.4 for the recognized keys and their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,

    pub poll_interval: Duration,
    pub batch_limit: u32,
    pub lease_seconds: u32,
    pub max_attempts: u32,
    pub base_delay_seconds: u32,
    pub concurrency: usize,
    pub graceful_timeout: Duration,

    pub singleton_ttl_seconds: u32,
    pub singleton_refresh_seconds: u32,

    pub enable_heartbeat: bool,
    pub daily_summary_users: Vec<String>,
    pub work_sampling_prompts_per_day: u32,
}

impl Config {
    /// Load configuration from environment variables, applying spec.md's
    /// documented defaults for anything left unset.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env_or("PORT", 8080u16)?,

            poll_interval: Duration::from_secs(env_or("POLL_INTERVAL_SECONDS", 30u64)?),
            batch_limit: env_or("BATCH_LIMIT", 25u32)?,
            lease_seconds: env_or("LEASE_SECONDS", 60u32)?,
            max_attempts: env_or("MAX_ATTEMPTS", 5u32)?,
            base_delay_seconds: env_or("BASE_DELAY_SECONDS", 60u32)?,
            concurrency: env_or("CONCURRENCY", 8usize)?,
            graceful_timeout: Duration::from_secs(env_or("GRACEFUL_TIMEOUT_SECONDS", 30u64)?),

            singleton_ttl_seconds: env_or("SINGLETON_TTL_SECONDS", 90u32)?,
            singleton_refresh_seconds: env_or("SINGLETON_REFRESH_SECONDS", 30u32)?,

            enable_heartbeat: env_or("ENABLE_HEARTBEAT", false)?,
            daily_summary_users: env::var("DAILY_SUMMARY_USERS")
                .ok()
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            work_sampling_prompts_per_day: env_or("WORK_SAMPLING_PROMPTS_PER_DAY", 4u32)?,
        })
    }
}
