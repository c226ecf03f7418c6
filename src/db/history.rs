use sqlx::SqlitePool;
use tracing::debug;

use crate::db::models::HistoricalRow;
use crate::error::Result;
use crate::types::RawListing;

/// Durable once-only record per listing identifier, pruned after expiry.
///
/// Dedup relies on the primary key on `id`: concurrent cycles may race on
/// the same identifier and whichever insert lands first wins. The loser's
/// unique-violation is expected and benign.
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert every listing in `batch` that has never been seen before,
    /// stamping `first_seen = now_ms`. Returns the count of new rows.
    ///
    /// A unique-violation means another insert (this batch, a concurrent
    /// cycle, or an earlier cycle) already recorded the id — skipped, not
    /// an error. Any other failure aborts the rest of the batch; rows
    /// already inserted stay.
    pub async fn record_batch(&self, batch: &[RawListing], now_ms: i64) -> Result<u64> {
        let mut inserted = 0u64;
        for listing in batch {
            let result = sqlx::query(
                r#"
                INSERT INTO historical_listings
                    (id, seller, item_name, starting_bid, tier, bin, end_time, item_lore, first_seen)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&listing.id)
            .bind(&listing.seller)
            .bind(&listing.item_name)
            .bind(listing.starting_bid)
            .bind(listing.tier.to_uppercase())
            .bind(listing.bin)
            .bind(listing.end)
            .bind(listing.item_lore.as_deref())
            .bind(now_ms)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => inserted += 1,
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    debug!(id = %listing.id, "Historical record already present, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(inserted)
    }

    /// Delete every historical record whose end time is at or before
    /// `now_ms`. Returns the purged count. Idempotent.
    pub async fn sweep_expired(&self, now_ms: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM historical_listings WHERE end_time <= ?")
            .bind(now_ms)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// All historical records for one seller identifier, optionally only
    /// those whose end time is still in the future.
    pub async fn by_seller(
        &self,
        seller: &str,
        active_only: bool,
        now_ms: i64,
    ) -> Result<Vec<HistoricalRow>> {
        let rows = sqlx::query_as::<_, HistoricalRow>(
            r#"
            SELECT id, seller, item_name, starting_bid, tier, bin, end_time, item_lore, first_seen
            FROM historical_listings
            WHERE seller = ?1 AND (?2 = 0 OR end_time > ?3)
            ORDER BY first_seen DESC
            "#,
        )
        .bind(seller)
        .bind(active_only)
        .bind(now_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All historical records whose item name contains `item`
    /// (case-insensitive), optionally only unexpired ones.
    pub async fn by_item(
        &self,
        item: &str,
        active_only: bool,
        now_ms: i64,
    ) -> Result<Vec<HistoricalRow>> {
        let rows = sqlx::query_as::<_, HistoricalRow>(
            r#"
            SELECT id, seller, item_name, starting_bid, tier, bin, end_time, item_lore, first_seen
            FROM historical_listings
            WHERE instr(lower(item_name), lower(?1)) > 0 AND (?2 = 0 OR end_time > ?3)
            ORDER BY first_seen DESC
            "#,
        )
        .bind(item)
        .bind(active_only)
        .bind(now_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> HistoryStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        HistoryStore::new(pool)
    }

    fn listing(id: &str, end: i64) -> RawListing {
        RawListing {
            id: id.to_string(),
            seller: "seller1".to_string(),
            item_name: "Aspect of the End".to_string(),
            starting_bid: 5_000,
            tier: "rare".to_string(),
            bin: false,
            end,
            item_lore: None,
        }
    }

    #[tokio::test]
    async fn record_batch_is_idempotent() {
        let store = test_store().await;
        let batch = vec![listing("a", 10_000), listing("b", 20_000)];

        let first = store.record_batch(&batch, 100).await.unwrap();
        assert_eq!(first, 2);

        // Same batch again: nothing new to insert.
        let second = store.record_batch(&batch, 200).await.unwrap();
        assert_eq!(second, 0);

        // first_seen kept from the winning insert.
        let rows = store.by_seller("seller1", false, 0).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.first_seen == 100));
    }

    #[tokio::test]
    async fn duplicate_id_within_one_batch_is_skipped() {
        let store = test_store().await;
        let batch = vec![listing("x", 10_000), listing("x", 10_000)];

        let inserted = store.record_batch(&batch, 1).await.unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.by_seller("seller1", false, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let store = test_store().await;
        let batch = vec![listing("expired", 1_000), listing("live", 9_000)];
        store.record_batch(&batch, 1).await.unwrap();

        let swept = store.sweep_expired(5_000).await.unwrap();
        assert_eq!(swept, 1);

        let rows = store.by_seller("seller1", false, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "live");

        // Idempotent: sweeping again over the same data changes nothing.
        assert_eq!(store.sweep_expired(5_000).await.unwrap(), 0);
        assert_eq!(store.by_seller("seller1", false, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweep_treats_end_time_equal_to_now_as_expired() {
        let store = test_store().await;
        store.record_batch(&[listing("edge", 5_000)], 1).await.unwrap();
        assert_eq!(store.sweep_expired(5_000).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn by_seller_active_filter_excludes_expired() {
        let store = test_store().await;
        let batch = vec![listing("old", 1_000), listing("new", 9_000)];
        store.record_batch(&batch, 1).await.unwrap();

        let active = store.by_seller("seller1", true, 5_000).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "new");

        let all = store.by_seller("seller1", false, 5_000).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn by_item_matches_substring_case_insensitively() {
        let store = test_store().await;
        store.record_batch(&[listing("a", 9_000)], 1).await.unwrap();

        assert_eq!(store.by_item("aspect", false, 0).await.unwrap().len(), 1);
        assert_eq!(store.by_item("THE END", false, 0).await.unwrap().len(), 1);
        assert!(store.by_item("hyperion", false, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tier_is_stored_uppercased() {
        let store = test_store().await;
        store.record_batch(&[listing("a", 9_000)], 1).await.unwrap();
        let rows = store.by_seller("seller1", false, 0).await.unwrap();
        assert_eq!(rows[0].tier, "RARE");
    }
}
