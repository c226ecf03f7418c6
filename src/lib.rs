//! Marketplace auction tracker.
//!
//! Ingests a paginated auction feed on a fixed interval, keeps a queryable
//! snapshot of currently active listings, and retains one deduplicated
//! historical record per listing until its end time passes.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod ingest;
pub mod sweeper;
pub mod types;
