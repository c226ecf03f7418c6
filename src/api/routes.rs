use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{HistoricalRow, ListingRow};
use crate::db::{HistoryStore, SearchFilter, SnapshotStore};
use crate::error::AppError;
use crate::identity::{self, IdentityClient};
use crate::types::now_ms;

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub history: HistoryStore,
    pub snapshot: SnapshotStore,
    pub identity: IdentityClient,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/auctions", get(search_auctions))
        .route("/history/player/:player", get(player_history))
        .route("/history/item/:item", get(item_history))
        .route("/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SearchQuery {
    pub item: Option<String>,
    pub rarity: Option<String>,
    pub bin: Option<bool>,
    pub skip: Option<i64>,
}

#[derive(Deserialize)]
pub struct ActiveQuery {
    pub active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListingResponse {
    pub id: String,
    pub seller: String,
    pub item_name: String,
    pub starting_bid: i64,
    pub tier: String,
    pub bin: bool,
    pub end_time: i64,
    pub item_lore: Option<String>,
}

impl From<ListingRow> for ListingResponse {
    fn from(r: ListingRow) -> Self {
        Self {
            id: r.id,
            seller: r.seller,
            item_name: r.item_name,
            starting_bid: r.starting_bid,
            tier: r.tier,
            bin: r.bin,
            end_time: r.end_time,
            item_lore: r.item_lore,
        }
    }
}

#[derive(Serialize)]
pub struct HistoricalResponse {
    pub id: String,
    pub seller: String,
    pub item_name: String,
    pub starting_bid: i64,
    pub tier: String,
    pub bin: bool,
    pub end_time: i64,
    pub item_lore: Option<String>,
    pub first_seen: i64,
}

impl From<HistoricalRow> for HistoricalResponse {
    fn from(r: HistoricalRow) -> Self {
        Self {
            id: r.id,
            seller: r.seller,
            item_name: r.item_name,
            starting_bid: r.starting_bid,
            tier: r.tier,
            bin: r.bin,
            end_time: r.end_time,
            item_lore: r.item_lore,
            first_seen: r.first_seen,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn search_auctions(
    State(state): State<ApiState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<ListingResponse>>, AppError> {
    let filter = SearchFilter {
        item: params.item,
        rarity: params.rarity,
        bin: params.bin,
        skip: params.skip.unwrap_or(0),
    };
    let rows = state.snapshot.search(&filter).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Historical listings by seller. Accepts either the bare identifier or a
/// display name, which is resolved through the identity API first.
async fn player_history(
    State(state): State<ApiState>,
    Path(player): Path<String>,
    Query(params): Query<ActiveQuery>,
) -> Result<Json<Vec<HistoricalResponse>>, AppError> {
    let seller = if identity::is_identifier(&player) {
        player
    } else {
        state.identity.resolve(&player).await?
    };
    let rows = state
        .history
        .by_seller(&seller, params.active.unwrap_or(false), now_ms())
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn item_history(
    State(state): State<ApiState>,
    Path(item): Path<String>,
    Query(params): Query<ActiveQuery>,
) -> Result<Json<Vec<HistoricalResponse>>, AppError> {
    let rows = state
        .history
        .by_item(&item, params.active.unwrap_or(false), now_ms())
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse { status: "ok", database: true }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "unavailable", database: false }),
        ),
    }
}
