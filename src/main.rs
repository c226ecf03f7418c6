use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use auction_tracker::api::routes::{router, ApiState};
use auction_tracker::config::{Config, REQUEST_TIMEOUT_SECS};
use auction_tracker::db::{HistoryStore, SnapshotStore};
use auction_tracker::error::Result;
use auction_tracker::identity::IdentityClient;
use auction_tracker::ingest::Ingestor;
use auction_tracker::sweeper::ExpirySweeper;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let options = SqliteConnectOptions::new()
        .filename(&cfg.db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // One shared client; every outbound request carries the fixed timeout.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;

    // --- Spawn background tasks ---

    // Ingestion orchestrator: startup cycle, then every fetch_interval_secs
    let ingestor = Ingestor::new(cfg.clone(), client.clone(), pool.clone());
    tokio::spawn(async move { ingestor.run().await });

    // Expiry sweeper on its own independent schedule
    let sweeper = ExpirySweeper::new(HistoryStore::new(pool.clone()), cfg.sweep_interval_secs);
    tokio::spawn(async move { sweeper.run().await });

    // --- HTTP API server ---
    let api_state = ApiState {
        pool: pool.clone(),
        history: HistoryStore::new(pool.clone()),
        snapshot: SnapshotStore::new(pool),
        identity: IdentityClient::new(client, cfg.identity_api_url.clone()),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
