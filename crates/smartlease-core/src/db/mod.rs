//! Database layer for smartlease
//!
//! Provides SQLite-based storage with:
//! - One row per property listing, every attribute stored as text
//! - Embeddings stored as little-endian `f32` BLOBs
//! - SQL scalar functions for cosine ranking and numeric filtering
//! - A bounded connection pool for concurrent requests

mod functions;
mod pool;
mod properties;
mod schema;
mod stats;
pub mod vectors;

pub use functions::numeric_value;
pub use pool::{DatabasePool, PooledDatabase};
pub use properties::{
    hash_summary, PropertyRecord, UpsertOutcome, PROPERTY_COLUMNS, SUMMARY_COLUMN,
};
pub use schema::Database;
pub use stats::StoreStats;
pub use vectors::ScoredProperty;
use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("properties.sqlite")
    }
}
