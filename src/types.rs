use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Feed wire types
// ---------------------------------------------------------------------------

/// One auction listing as the upstream feed serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    #[serde(rename = "uuid")]
    pub id: String,
    #[serde(rename = "auctioneer")]
    pub seller: String,
    pub item_name: String,
    pub starting_bid: i64,
    /// Rarity tier as the feed labels it ("LEGENDARY", "rare", ...).
    /// Stored uppercased so rarity filters can match exactly.
    pub tier: String,
    /// Buy-it-now flag. Absent on plain auctions.
    #[serde(default)]
    pub bin: bool,
    /// Auction end time, milliseconds since epoch.
    pub end: i64,
    #[serde(default)]
    pub item_lore: Option<String>,
}

/// Response envelope shared by the unpaged and paged feed requests.
/// `success: false` is a logical failure even on HTTP 200.
#[derive(Debug, Deserialize)]
pub struct FeedPage {
    pub success: bool,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
    #[serde(default)]
    pub auctions: Vec<RawListing>,
    #[serde(default)]
    pub cause: Option<String>,
}

// ---------------------------------------------------------------------------
// Ingestion cycle
// ---------------------------------------------------------------------------

/// Stage an ingestion cycle is in, for logging and failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetching,
    Deduplicating,
    Sweeping,
    Publishing,
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CycleStage::Fetching => "fetching",
            CycleStage::Deduplicating => "deduplicating",
            CycleStage::Sweeping => "sweeping",
            CycleStage::Publishing => "publishing",
        };
        write!(f, "{s}")
    }
}

/// Counters from one completed ingestion cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleOutcome {
    /// Listings in the fetched batch.
    pub fetched: usize,
    /// Historical rows newly inserted by dedup.
    pub inserted: u64,
    /// Expired historical rows purged.
    pub swept: u64,
    /// Rows written into the fresh snapshot.
    pub published: u64,
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_page_parses_full_body() {
        let body = r#"{
            "success": true,
            "totalPages": 42,
            "auctions": [{
                "uuid": "409a1e0f261a49849493278d6cd9305a",
                "auctioneer": "347ef6c1daac45ed9d1fa02818cf0fb6",
                "item_name": "Aspect of the End",
                "starting_bid": 5000,
                "tier": "RARE",
                "bin": true,
                "end": 1700000000000,
                "item_lore": "a sword"
            }]
        }"#;
        let page: FeedPage = serde_json::from_str(body).unwrap();
        assert!(page.success);
        assert_eq!(page.total_pages, 42);
        assert_eq!(page.auctions.len(), 1);
        let listing = &page.auctions[0];
        assert_eq!(listing.item_name, "Aspect of the End");
        assert!(listing.bin);
        assert_eq!(listing.end, 1_700_000_000_000);
    }

    #[test]
    fn feed_page_failure_body_parses_without_auctions() {
        let body = r#"{"success": false, "cause": "Invalid page"}"#;
        let page: FeedPage = serde_json::from_str(body).unwrap();
        assert!(!page.success);
        assert_eq!(page.cause.as_deref(), Some("Invalid page"));
        assert!(page.auctions.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn bin_defaults_to_false() {
        let body = r#"{
            "uuid": "x", "auctioneer": "y", "item_name": "Dirt",
            "starting_bid": 1, "tier": "COMMON", "end": 0
        }"#;
        let listing: RawListing = serde_json::from_str(body).unwrap();
        assert!(!listing.bin);
        assert!(listing.item_lore.is_none());
    }
}
