/// Database row types for the two listing collections.
/// Used by sqlx for typed queries.

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    pub id: String,
    pub seller: String,
    pub item_name: String,
    pub starting_bid: i64,
    pub tier: String,
    pub bin: bool,
    pub end_time: i64,
    pub item_lore: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoricalRow {
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
