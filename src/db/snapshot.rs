use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::config::{SEARCH_PAGE_SIZE, SNAPSHOT_CHUNK_SIZE};
use crate::db::models::ListingRow;
use crate::error::Result;
use crate::types::RawListing;

/// Filters for the current-listings search. All optional; `skip` pages
/// through results ordered by ascending starting bid.
#[derive(Debug, Default, Clone)]
pub struct SearchFilter {
    pub item: Option<String>,
    pub rarity: Option<String>,
    pub bin: Option<bool>,
    pub skip: i64,
}

/// The transient "current listings" view, replaced wholesale each cycle.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the whole current view with `batch`.
    ///
    /// Clear-then-insert: readers may briefly see an empty or partially
    /// populated view while the new batch lands. Inserts go in chunks with
    /// OR IGNORE so a duplicate id never blocks the rest of its chunk;
    /// any other chunk error aborts the remaining chunks.
    pub async fn publish(&self, batch: &[RawListing]) -> Result<u64> {
        sqlx::query("DELETE FROM listings").execute(&self.pool).await?;

        let mut published = 0u64;
        for chunk in batch.chunks(SNAPSHOT_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO listings \
                 (id, seller, item_name, starting_bid, tier, bin, end_time, item_lore) ",
            );
            qb.push_values(chunk, |mut b, listing| {
                b.push_bind(&listing.id)
                    .push_bind(&listing.seller)
                    .push_bind(&listing.item_name)
                    .push_bind(listing.starting_bid)
                    .push_bind(listing.tier.to_uppercase())
                    .push_bind(listing.bin)
                    .push_bind(listing.end)
                    .push_bind(listing.item_lore.as_deref());
            });
            let result = qb.build().execute(&self.pool).await?;
            published += result.rows_affected();
        }

        debug!(published, total = batch.len(), "Snapshot replaced");
        Ok(published)
    }

    /// Up to 100 current listings matching `filter`, cheapest first.
    /// An empty match is an empty vec, never an error.
    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<ListingRow>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT id, seller, item_name, starting_bid, tier, bin, end_time, item_lore
            FROM listings
            WHERE (?1 IS NULL OR instr(lower(item_name), lower(?1)) > 0)
              AND (?2 IS NULL OR upper(tier) = upper(?2))
              AND (?3 IS NULL OR bin = ?3)
            ORDER BY starting_bid ASC
            LIMIT ?4 OFFSET ?5
            "#,
        )
        .bind(filter.item.as_deref())
        .bind(filter.rarity.as_deref())
        .bind(filter.bin)
        .bind(SEARCH_PAGE_SIZE)
        .bind(filter.skip.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
