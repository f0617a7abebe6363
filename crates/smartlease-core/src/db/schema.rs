//! Database schema and initialization

use super::functions::register_functions;
use super::properties::{PROPERTY_COLUMNS, SUMMARY_COLUMN};
use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;

/// Main database handle
pub struct Database {
    pub(crate) conn: Connection,
}

const SCHEMA_VERSION: i32 = 1;

const CREATE_SUPPORT_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Model metadata for dimension validation
CREATE TABLE IF NOT EXISTS model_metadata (
    model TEXT PRIMARY KEY,
    dimensions INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    last_used_at TEXT NOT NULL
);
"#;

/// Build the `properties` DDL from the fixed column list.
///
/// Identifiers come from [`PROPERTY_COLUMNS`] only.
fn create_properties_sql() -> String {
    let attribute_columns: Vec<String> = PROPERTY_COLUMNS
        .iter()
        .skip(1)
        .map(|col| format!("    {} TEXT NOT NULL DEFAULT ''", col))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS properties (
    property_id TEXT PRIMARY KEY,
{},
    {} TEXT NOT NULL,
    summary_hash TEXT NOT NULL,
    embedding BLOB,
    embedding_model TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_properties_embedding_model ON properties(embedding_model);",
        attribute_columns.join(",\n"),
        SUMMARY_COLUMN
    )
}

impl Database {
    /// Open database at path, creating if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        register_functions(&conn)?;
        Ok(Self { conn })
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        register_functions(&conn)?;
        Ok(Self { conn })
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        // journal_mode returns a row, so it cannot go through execute_batch
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        self.conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA busy_timeout = 5000;",
        )?;

        self.conn.execute_batch(CREATE_SUPPORT_TABLES)?;
        self.conn.execute_batch(&create_properties_sql())?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }
}
