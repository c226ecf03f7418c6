use crate::error::{AppError, Result};

pub const FEED_URL: &str = "https://api.hypixel.net/v2/skyblock/auctions";
pub const IDENTITY_API_URL: &str = "https://api.mojang.com/users/profiles/minecraft";

/// Per-request timeout for all outbound HTTP (feed pages, identity lookups).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How often a full ingestion cycle runs (seconds).
pub const FETCH_INTERVAL_SECS: u64 = 300;

/// How often the expiry sweeper runs, independent of ingestion (seconds).
pub const SWEEP_INTERVAL_SECS: u64 = 300;

/// Feed pages in flight at once during a cycle.
pub const PAGE_CONCURRENCY: usize = 5;

/// Whole-cycle fetch attempts before the cycle is declared failed.
pub const FETCH_MAX_ATTEMPTS: u32 = 5;

/// Base unit for linear retry backoff (milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 5_000;

/// Ceiling for the rate-limited backoff (milliseconds).
pub const RATE_LIMIT_CAP_MS: u64 = 300_000;

/// Fixed delay after a request timeout before retrying (milliseconds).
pub const TIMEOUT_RETRY_DELAY_MS: u64 = 10_000;

/// Rows per chunk when bulk-inserting the new snapshot.
pub const SNAPSHOT_CHUNK_SIZE: usize = 1_000;

/// Hard cap on rows returned by the search endpoint.
pub const SEARCH_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_url: String,
    pub identity_api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    pub fetch_interval_secs: u64,
    pub sweep_interval_secs: u64,
    pub page_concurrency: usize,
    pub fetch_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub rate_limit_cap_ms: u64,
    pub timeout_retry_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            feed_url: std::env::var("FEED_URL").unwrap_or_else(|_| FEED_URL.to_string()),
            identity_api_url: std::env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| IDENTITY_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tracker.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            fetch_interval_secs: env_u64("FETCH_INTERVAL_SECS", FETCH_INTERVAL_SECS),
            sweep_interval_secs: env_u64("SWEEP_INTERVAL_SECS", SWEEP_INTERVAL_SECS),
            page_concurrency: env_u64("PAGE_CONCURRENCY", PAGE_CONCURRENCY as u64).max(1) as usize,
            fetch_max_attempts: env_u64("FETCH_MAX_ATTEMPTS", FETCH_MAX_ATTEMPTS as u64).max(1)
                as u32,
            retry_base_delay_ms: env_u64("RETRY_BASE_DELAY_MS", RETRY_BASE_DELAY_MS),
            rate_limit_cap_ms: env_u64("RATE_LIMIT_CAP_MS", RATE_LIMIT_CAP_MS),
            timeout_retry_delay_ms: env_u64("TIMEOUT_RETRY_DELAY_MS", TIMEOUT_RETRY_DELAY_MS),
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
