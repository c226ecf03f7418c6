pub mod history;
pub mod models;
pub mod snapshot;

pub use history::HistoryStore;
pub use snapshot::{SearchFilter, SnapshotStore};
