use std::time::Duration;

use sqlx::SqlitePool;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::{HistoryStore, SnapshotStore};
use crate::error::AppError;
use crate::fetcher::PagedFetcher;
use crate::types::{now_ms, CycleOutcome, CycleStage};

/// A cycle failure with the stage it died in.
#[derive(Debug)]
pub struct CycleError {
    pub stage: CycleStage,
    pub source: AppError,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cycle failed while {}: {}", self.stage, self.source)
    }
}

impl std::error::Error for CycleError {}

/// Sequences one ingestion cycle: fetch → dedupe → sweep → publish.
///
/// Runs once at startup, then on a fixed interval. Scheduled cycles are
/// spawned as their own tasks, so a slow cycle never delays the next tick;
/// overlapping cycles are safe because every store operation tolerates
/// duplicates and re-runs.
#[derive(Clone)]
pub struct Ingestor {
    cfg: Config,
    fetcher: PagedFetcher,
    history: HistoryStore,
    snapshot: SnapshotStore,
}

impl Ingestor {
    pub fn new(cfg: Config, client: reqwest::Client, pool: SqlitePool) -> Self {
        Self {
            fetcher: PagedFetcher::new(client, cfg.clone()),
            history: HistoryStore::new(pool.clone()),
            snapshot: SnapshotStore::new(pool),
            cfg,
        }
    }

    pub async fn run(self) {
        self.run_cycle_logged().await;

        let mut ticker = interval(Duration::from_secs(self.cfg.fetch_interval_secs));
        ticker.tick().await; // immediate first tick — the startup cycle already ran

        loop {
            ticker.tick().await;
            let ingestor = self.clone();
            tokio::spawn(async move { ingestor.run_cycle_logged().await });
        }
    }

    /// Run one cycle, logging the outcome. A failed cycle never takes the
    /// process down or blocks the next scheduled one.
    pub async fn run_cycle_logged(&self) {
        match self.run_cycle().await {
            Ok(outcome) => info!(
                fetched = outcome.fetched,
                inserted = outcome.inserted,
                swept = outcome.swept,
                published = outcome.published,
                "Ingestion cycle complete"
            ),
            Err(e) => error!(stage = %e.stage, "Ingestion cycle failed: {}", e.source),
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        debug!(stage = %CycleStage::Fetching, "Cycle started");
        let batch = self
            .fetcher
            .fetch_all()
            .await
            .map_err(|e| CycleError { stage: CycleStage::Fetching, source: e })?;

        debug!(stage = %CycleStage::Deduplicating, batch = batch.len(), "Batch fetched");
        let inserted = self
            .history
            .record_batch(&batch, now_ms())
            .await
            .map_err(|e| CycleError { stage: CycleStage::Deduplicating, source: e })?;

        // Best-effort housekeeping: a failed sweep is never cycle-fatal,
        // the independent sweeper schedule will catch up.
        debug!(stage = %CycleStage::Sweeping, "History updated");
        let swept = match self.history.sweep_expired(now_ms()).await {
            Ok(n) => n,
            Err(e) => {
                warn!("End-of-cycle expiry sweep failed: {e}");
                0
            }
        };

        debug!(stage = %CycleStage::Publishing, "Expired history purged");
        let published = self
            .snapshot
            .publish(&batch)
            .await
            .map_err(|e| CycleError { stage: CycleStage::Publishing, source: e })?;

        Ok(CycleOutcome { fetched: batch.len(), inserted, swept, published })
    }
}
