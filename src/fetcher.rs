use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{FeedPage, RawListing};

/// Fetches every page of the upstream auction feed for one ingestion cycle.
///
/// The retry budget applies to the whole fetch, not individual pages: any
/// page failing fails the attempt, and the next attempt starts over from
/// the discovery request.
#[derive(Clone)]
pub struct PagedFetcher {
    client: reqwest::Client,
    cfg: Config,
}

impl PagedFetcher {
    pub fn new(client: reqwest::Client, cfg: Config) -> Self {
        Self { client, cfg }
    }

    /// Fetch the full feed with the cycle-level retry policy applied.
    /// Exhausting all attempts propagates the last error to the caller.
    pub async fn fetch_all(&self) -> Result<Vec<RawListing>> {
        let mut attempt = 1u32;
        loop {
            match self.fetch_once().await {
                Ok(batch) => return Ok(batch),
                Err(err) if attempt < self.cfg.fetch_max_attempts => {
                    let delay = retry_delay(&err, attempt, &self.cfg);
                    warn!(
                        attempt,
                        max_attempts = self.cfg.fetch_max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Feed fetch failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(attempt, "Feed fetch failed, retry budget exhausted: {err}");
                    return Err(err);
                }
            }
        }
    }

    /// One fetch attempt: discover the page count, then pull all pages with
    /// a bounded concurrency window and concatenate them in page order.
    async fn fetch_once(&self) -> Result<Vec<RawListing>> {
        let first = self.fetch_page(None).await?;
        let total = first.total_pages;
        debug!(total_pages = total, "Feed page count discovered");

        if total == 0 {
            return Ok(first.auctions);
        }

        let mut pages = stream::iter(0..total)
            .map(|page| self.fetch_page(Some(page)))
            .buffered(self.cfg.page_concurrency);

        let mut batch = Vec::new();
        while let Some(result) = pages.next().await {
            batch.extend(result?.auctions);
        }
        Ok(batch)
    }

    async fn fetch_page(&self, page: Option<u32>) -> Result<FeedPage> {
        let url = match page {
            Some(n) => page_url(&self.cfg.feed_url, n),
            None => self.cfg.feed_url.clone(),
        };

        let resp = self.client.get(&url).send().await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited);
        }

        let body: FeedPage = resp.json().await?;
        if !body.success {
            let cause = body.cause.unwrap_or_else(|| "no cause given".to_string());
            return Err(AppError::Upstream(cause));
        }
        Ok(body)
    }
}

fn page_url(base: &str, page: u32) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}page={page}")
}

/// Backoff before retry `attempt + 1`:
/// - rate limited: linear in the attempt number, capped;
/// - timeout: fixed delay;
/// - anything else: linear in the attempt number, uncapped.
pub fn retry_delay(err: &AppError, attempt: u32, cfg: &Config) -> Duration {
    let ms = match err {
        AppError::RateLimited => {
            (cfg.retry_base_delay_ms * attempt as u64).min(cfg.rate_limit_cap_ms)
        }
        AppError::Timeout => cfg.timeout_retry_delay_ms,
        _ => cfg.retry_base_delay_ms * attempt as u64,
    };
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cfg() -> Config {
        Config {
            feed_url: "http://feed.test/auctions".to_string(),
            identity_api_url: "http://identity.test".to_string(),
            log_level: "info".to_string(),
            db_path: ":memory:".to_string(),
            api_port: 0,
            fetch_interval_secs: 300,
            sweep_interval_secs: 300,
            page_concurrency: 5,
            fetch_max_attempts: 5,
            retry_base_delay_ms: 5_000,
            rate_limit_cap_ms: 12_000,
            timeout_retry_delay_ms: 10_000,
        }
    }

    #[test]
    fn rate_limit_backoff_is_linear_then_capped() {
        let cfg = test_cfg();
        let err = AppError::RateLimited;
        assert_eq!(retry_delay(&err, 1, &cfg), Duration::from_millis(5_000));
        assert_eq!(retry_delay(&err, 2, &cfg), Duration::from_millis(10_000));
        // 3 * 5000 = 15000 exceeds the 12000 cap
        assert_eq!(retry_delay(&err, 3, &cfg), Duration::from_millis(12_000));
        assert_eq!(retry_delay(&err, 4, &cfg), Duration::from_millis(12_000));
    }

    #[test]
    fn timeout_backoff_is_fixed() {
        let cfg = test_cfg();
        let err = AppError::Timeout;
        assert_eq!(retry_delay(&err, 1, &cfg), Duration::from_millis(10_000));
        assert_eq!(retry_delay(&err, 4, &cfg), Duration::from_millis(10_000));
    }

    #[test]
    fn other_errors_back_off_linearly_without_cap() {
        let cfg = test_cfg();
        let err = AppError::Upstream("boom".to_string());
        assert_eq!(retry_delay(&err, 1, &cfg), Duration::from_millis(5_000));
        assert_eq!(retry_delay(&err, 4, &cfg), Duration::from_millis(20_000));
    }

    #[test]
    fn page_url_appends_with_correct_separator() {
        assert_eq!(page_url("http://h/auctions", 3), "http://h/auctions?page=3");
        assert_eq!(page_url("http://h/auctions?key=k", 3), "http://h/auctions?key=k&page=3");
    }
}
