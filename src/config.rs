//! # Configuration Module
//!
//! This module defines configuration structures for the bot, loaded from
//! environment variables (optionally via a `.env` file) with defaults for
//! everything except the bot token and the backend address.

use std::time::Duration;

use anyhow::{bail, Context, Result};

// Constants for backend access
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DETAILS_LANGUAGE: &str = "english";

// Constants for search flows
pub const DEFAULT_GENRE_MIN_RATING: u32 = 90;
pub const DEFAULT_GENRE_MIN_VOTES: u32 = 2000;
pub const DEFAULT_BUDGET_MIN_RATING: u32 = 70;
pub const DEFAULT_MAX_OFFERED_ITEMS: usize = 10;

// Constants for the notification scheduler
pub const DEFAULT_DISCOUNT_INTERVAL_MINUTES: i64 = 30;
pub const DEFAULT_NEWS_INTERVAL_MINUTES: i64 = 60;
pub const DEFAULT_SCHEDULER_POLL_SECS: u64 = 60;
pub const DIGEST_SIZE: usize = 10;

/// Backend API access settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the backend, e.g. `https://api.example.com/`
    pub base_url: String,
    /// Timeout applied to every backend request
    pub timeout: Duration,
    /// Language requested for item details
    pub details_language: String,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            details_language: DEFAULT_DETAILS_LANGUAGE.to_string(),
        }
    }
}

/// Thresholds and limits for the search flows
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum rating for genre search results
    pub genre_min_rating: u32,
    /// Minimum number of votes for genre search results
    pub genre_min_votes: u32,
    /// Minimum rating for budget search results
    pub budget_min_rating: u32,
    /// Maximum number of items offered for selection
    pub max_offered_items: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            genre_min_rating: DEFAULT_GENRE_MIN_RATING,
            genre_min_votes: DEFAULT_GENRE_MIN_VOTES,
            budget_min_rating: DEFAULT_BUDGET_MIN_RATING,
            max_offered_items: DEFAULT_MAX_OFFERED_ITEMS,
        }
    }
}

/// Broadcast intervals
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minimum time between two discount digest attempts
    pub discount_interval: chrono::Duration,
    /// Minimum time between two news digest attempts
    pub news_interval: chrono::Duration,
    /// How often the loop checks whether a job is due
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            discount_interval: chrono::Duration::minutes(DEFAULT_DISCOUNT_INTERVAL_MINUTES),
            news_interval: chrono::Duration::minutes(DEFAULT_NEWS_INTERVAL_MINUTES),
            poll_interval: Duration::from_secs(DEFAULT_SCHEDULER_POLL_SECS),
        }
    }
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub gateway: GatewayConfig,
    pub search: SearchConfig,
    pub scheduler: SchedulerConfig,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl BotConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let base_url = required("API_BASE_URL")?;
        reqwest::Url::parse(&base_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {base_url}"))?;

        let mut gateway = GatewayConfig::new(base_url);
        gateway.timeout = Duration::from_secs(parse_or(
            &lookup,
            "API_TIMEOUT_SECS",
            DEFAULT_API_TIMEOUT_SECS,
        )?);
        if let Some(language) = lookup("DETAILS_LANGUAGE").filter(|l| !l.trim().is_empty()) {
            gateway.details_language = language.trim().to_string();
        }

        let search = SearchConfig {
            genre_min_rating: parse_or(&lookup, "GENRE_MIN_RATING", DEFAULT_GENRE_MIN_RATING)?,
            genre_min_votes: parse_or(&lookup, "GENRE_MIN_VOTES", DEFAULT_GENRE_MIN_VOTES)?,
            budget_min_rating: parse_or(&lookup, "BUDGET_MIN_RATING", DEFAULT_BUDGET_MIN_RATING)?,
            max_offered_items: parse_positive(
                &lookup,
                "MAX_OFFERED_ITEMS",
                DEFAULT_MAX_OFFERED_ITEMS,
            )?,
        };

        let scheduler = SchedulerConfig {
            discount_interval: parse_minutes(
                &lookup,
                "DISCOUNT_INTERVAL_MINUTES",
                DEFAULT_DISCOUNT_INTERVAL_MINUTES,
            )?,
            news_interval: parse_minutes(
                &lookup,
                "NEWS_INTERVAL_MINUTES",
                DEFAULT_NEWS_INTERVAL_MINUTES,
            )?,
            poll_interval: Duration::from_secs(parse_positive(
                &lookup,
                "SCHEDULER_POLL_SECS",
                DEFAULT_SCHEDULER_POLL_SECS,
            )?),
        };

        let json_logs = lookup("LOG_FORMAT")
            .map(|format| format.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            telegram_token,
            gateway,
            search,
            scheduler,
            json_logs,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

/// Like [`parse_or`], rejecting zero and negative values
fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default + std::fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse_or(lookup, key, default)?;
    if value <= T::default() {
        bail!("{key} must be greater than zero, got {value}");
    }
    Ok(value)
}

fn parse_minutes<F>(lookup: &F, key: &str, default: i64) -> Result<chrono::Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let minutes = parse_positive(lookup, key, default)?;
    chrono::Duration::try_minutes(minutes)
        .with_context(|| format!("{key} is out of range: {minutes}"))
}
