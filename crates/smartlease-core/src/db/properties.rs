//! Property row storage

use super::Database;
use crate::error::{Result, SmartLeaseError};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Listing attribute columns in feed order. The order defines the summary.
pub const PROPERTY_COLUMNS: &[&str] = &[
    "property_id",
    "address",
    "status",
    "style",
    "beds",
    "full_baths",
    "sqft",
    "year_built",
    "list_price",
    "latitude",
    "longitude",
    "neighborhoods",
    "county",
    "nearby_schools",
    "primary_photo",
    "alt_photos",
    "restaurant_name",
    "restaurant_rating",
    "restaurant_address",
    "cafe_name",
    "cafe_rating",
    "cafe_address",
    "hospital_name",
    "hospital_rating",
    "hospital_address",
    "pharmacy_name",
    "pharmacy_rating",
    "pharmacy_address",
    "atm_name",
    "atm_rating",
    "atm_address",
    "bank_name",
    "bank_rating",
    "bank_address",
];

/// Derived full-text summary column, the embedding source
pub const SUMMARY_COLUMN: &str = "complete_property_details";

/// A stored property listing (embedding excluded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub property_id: String,

    /// Every attribute column except `property_id`, keyed by column name
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,

    /// Full-text summary derived from the attributes
    #[serde(rename = "complete_property_details")]
    pub summary: String,
}

impl PropertyRecord {
    /// Build a record from raw `(column, value)` pairs.
    ///
    /// Unknown columns are dropped, missing ones become empty strings and the
    /// summary is derived from the result.
    pub fn from_fields<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut property_id = None;
        let mut attributes: BTreeMap<String, String> = PROPERTY_COLUMNS
            .iter()
            .skip(1)
            .map(|col| (col.to_string(), String::new()))
            .collect();

        for (key, value) in fields {
            let key = key.as_ref().trim().to_lowercase();
            let value = value.into().trim().to_string();
            if key == "property_id" {
                property_id = Some(value);
            } else if let Some(slot) = attributes.get_mut(&key) {
                *slot = value;
            }
        }

        let property_id = property_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SmartLeaseError::InvalidInput("property_id is required".to_string()))?;

        let mut record = Self {
            property_id,
            attributes,
            summary: String::new(),
        };
        record.summary = record.derive_summary();
        Ok(record)
    }

    /// Value of an attribute column (empty when absent)
    pub fn get(&self, column: &str) -> &str {
        if column == "property_id" {
            return &self.property_id;
        }
        if column == SUMMARY_COLUMN {
            return &self.summary;
        }
        self.attributes.get(column).map(String::as_str).unwrap_or("")
    }

    /// Join every attribute value in column order with `", "`
    pub fn derive_summary(&self) -> String {
        PROPERTY_COLUMNS
            .iter()
            .map(|col| self.get(col))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Map a row selected with [`select_columns`] starting at `offset`
    pub(crate) fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let property_id: String = row.get(offset)?;
        let mut attributes = BTreeMap::new();
        for (idx, col) in PROPERTY_COLUMNS.iter().enumerate().skip(1) {
            attributes.insert(col.to_string(), row.get::<_, String>(offset + idx)?);
        }
        let summary: String = row.get(offset + PROPERTY_COLUMNS.len())?;
        Ok(Self {
            property_id,
            attributes,
            summary,
        })
    }
}

/// Comma-separated column list matching [`PropertyRecord::from_row`]
pub(crate) fn select_columns() -> String {
    let mut cols: Vec<&str> = PROPERTY_COLUMNS.to_vec();
    cols.push(SUMMARY_COLUMN);
    cols.join(", ")
}

/// Hash a summary using SHA-256
pub fn hash_summary(summary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(summary.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// What an upsert did to the stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New row; needs an embedding
    Inserted,
    /// Attributes changed the summary; embedding was cleared
    Updated,
    /// Same summary; embedding kept
    Unchanged,
}

impl Database {
    /// Insert a new property. Fails with `DuplicateProperty` if the id exists.
    pub fn insert_property(&self, record: &PropertyRecord) -> Result<()> {
        if self.property_exists(&record.property_id)? {
            return Err(SmartLeaseError::DuplicateProperty(
                record.property_id.clone(),
            ));
        }
        self.write_row(record, true)
    }

    /// Insert or update a property.
    ///
    /// The stored embedding is dropped whenever the summary changes so the
    /// next embedding pass regenerates it.
    pub fn upsert_property(&self, record: &PropertyRecord) -> Result<UpsertOutcome> {
        let summary = record.derive_summary();
        let new_hash = hash_summary(&summary);

        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT summary_hash FROM properties WHERE property_id = ?1",
                params![record.property_id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                self.write_row(record, true)?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(hash) if hash == new_hash => Ok(UpsertOutcome::Unchanged),
            Some(_) => {
                self.write_row(record, false)?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    fn write_row(&self, record: &PropertyRecord, insert: bool) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let summary = record.derive_summary();
        let summary_hash = hash_summary(&summary);

        // Values bound in PROPERTY_COLUMNS order, then summary, hash, timestamp
        let mut values: Vec<String> = PROPERTY_COLUMNS
            .iter()
            .map(|col| record.get(col).to_string())
            .collect();
        values.push(summary);
        values.push(summary_hash);
        values.push(now);

        let n = PROPERTY_COLUMNS.len();
        let sql = if insert {
            let placeholders: Vec<String> = (1..=n + 3).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO properties ({}, summary_hash, created_at, updated_at)
                 VALUES ({}, ?{})",
                select_columns(),
                placeholders.join(", "),
                n + 3
            )
        } else {
            let assignments: Vec<String> = PROPERTY_COLUMNS
                .iter()
                .enumerate()
                .skip(1)
                .map(|(idx, col)| format!("{} = ?{}", col, idx + 1))
                .collect();
            format!(
                "UPDATE properties SET {}, {} = ?{}, summary_hash = ?{},
                     embedding = NULL, embedding_model = NULL, updated_at = ?{}
                 WHERE property_id = ?1",
                assignments.join(", "),
                SUMMARY_COLUMN,
                n + 1,
                n + 2,
                n + 3
            )
        };

        self.conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(())
    }

    /// Check whether a property id is stored
    pub fn property_exists(&self, property_id: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM properties WHERE property_id = ?1)",
            params![property_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Fetch a property by id
    pub fn get_property(&self, property_id: &str) -> Result<Option<PropertyRecord>> {
        let sql = format!(
            "SELECT {} FROM properties WHERE property_id = ?1",
            select_columns()
        );
        let record = self
            .conn
            .query_row(&sql, params![property_id], |row| {
                PropertyRecord::from_row(row, 0)
            })
            .optional()?;
        Ok(record)
    }

    /// Count stored properties
    pub fn count_properties(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
