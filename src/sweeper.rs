use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use crate::db::HistoryStore;
use crate::types::now_ms;

/// Purges expired historical records on its own schedule, independent of
/// ingestion cycles. Failures are logged and swallowed — expiry is
/// best-effort housekeeping, never fatal.
pub struct ExpirySweeper {
    history: HistoryStore,
    interval_secs: u64,
}

impl ExpirySweeper {
    pub fn new(history: HistoryStore, interval_secs: u64) -> Self {
        Self { history, interval_secs }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs));
        ticker.tick().await; // skip the immediate first tick — each ingestion cycle also sweeps

        loop {
            ticker.tick().await;
            match self.history.sweep_expired(now_ms()).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Expired historical listings purged"),
                Err(e) => warn!("Expiry sweep failed: {e}"),
            }
        }
    }
}
