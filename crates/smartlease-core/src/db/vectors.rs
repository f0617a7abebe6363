//! Vector storage operations
//!
//! Stores embeddings as BLOBs next to the property row and ranks rows with
//! the `cosine_similarity` SQL function.

use super::properties::{select_columns, PropertyRecord};
use super::Database;
use crate::error::Result;
use crate::search::Predicate;
use chrono::Utc;
use rusqlite::params;
use rusqlite::types::Value;

/// A property row with its similarity to a query embedding
#[derive(Debug, Clone)]
pub struct ScoredProperty {
    pub record: PropertyRecord,
    pub similarity: f64,
}

impl Database {
    /// Store the embedding for a property
    pub fn set_embedding(&self, property_id: &str, model: &str, embedding: &[f32]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE properties SET embedding = ?1, embedding_model = ?2, updated_at = ?3
             WHERE property_id = ?4",
            params![embedding_to_bytes(embedding), model, now, property_id],
        )?;
        Ok(())
    }

    /// Properties with no embedding, or one produced by a different model.
    /// Returns `(property_id, summary)` pairs in insertion order.
    pub fn properties_needing_embedding(&self, model: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT property_id, complete_property_details FROM properties
             WHERE embedding IS NULL OR embedding_model IS NULL OR embedding_model != ?1
             ORDER BY rowid",
        )?;

        let results = stmt
            .query_map(params![model], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Drop every stored embedding so the next embedding pass redoes all rows
    pub fn clear_embeddings(&self) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE properties SET embedding = NULL, embedding_model = NULL",
            [],
        )?;
        self.conn.execute("DELETE FROM model_metadata", [])?;
        Ok(rows)
    }

    /// Rank embedded properties by cosine similarity to `query_embedding`.
    ///
    /// With a predicate, only matching rows are ranked. Equal similarities
    /// keep insertion order so repeated queries return identical lists.
    pub fn rank_by_similarity(
        &self,
        query_embedding: &[f32],
        predicate: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredProperty>> {
        let mut params: Vec<Value> = vec![
            Value::Blob(embedding_to_bytes(query_embedding)),
            Value::Integer(limit.min(i64::MAX as usize) as i64),
        ];

        let filter_sql = match predicate {
            Some(p) if !p.is_empty() => {
                let fragment = p.to_sql(params.len() + 1);
                params.extend(fragment.params);
                format!(" AND ({})", fragment.sql)
            }
            _ => String::new(),
        };

        let sql = format!(
            "SELECT {}, cosine_similarity(embedding, ?1) AS similarity
             FROM properties
             WHERE embedding IS NOT NULL{}
             ORDER BY similarity DESC, rowid ASC
             LIMIT ?2",
            select_columns(),
            filter_sql
        );

        let similarity_idx = super::PROPERTY_COLUMNS.len() + 1;
        let mut stmt = self.conn.prepare(&sql)?;
        let results = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(ScoredProperty {
                    record: PropertyRecord::from_row(row, 0)?,
                    similarity: row.get::<_, Option<f64>>(similarity_idx)?.unwrap_or(0.0),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Check if model dimensions are compatible with expected dimensions
    pub fn check_model_compatibility(&self, model: &str, expected_dims: usize) -> Result<bool> {
        match self.get_model_dimensions(model)? {
            Some(stored_dims) => Ok(stored_dims == expected_dims),
            None => Ok(true), // No stored model = compatible (will be registered)
        }
    }

    /// Register model with its dimensions
    pub fn register_model(&self, model: &str, dimensions: usize) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO model_metadata (model, dimensions, created_at, last_used_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(model) DO UPDATE SET dimensions = ?2, last_used_at = ?3",
            params![model, dimensions as i64, now],
        )?;

        Ok(())
    }

    /// Get stored model dimensions
    pub fn get_model_dimensions(&self, model: &str) -> Result<Option<usize>> {
        let result = self.conn.query_row(
            "SELECT dimensions FROM model_metadata WHERE model = ?1",
            params![model],
            |row| row.get::<_, i64>(0),
        );

        match result {
            Ok(dims) => Ok(Some(dims as usize)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{compile, QueryMetadata};
    use serde_json::json;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let rows = [
            ("p1", "1500", vec![1.0, 0.0]),
            ("p2", "2500", vec![0.8, 0.6]),
            ("p3", "1900", vec![0.0, 1.0]),
        ];
        for (id, price, emb) in rows {
            let rec = PropertyRecord::from_fields([("property_id", id), ("list_price", price)])
                .unwrap();
            db.insert_property(&rec).unwrap();
            db.set_embedding(id, "test-model", &emb).unwrap();
        }
        db
    }

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![1.0f32, 2.0, 3.0, -1.5];
        let bytes = embedding_to_bytes(&original);
        let restored = bytes_to_embedding(&bytes);
        assert_eq!(original, restored);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 0.0001);
    }

    #[test]
    fn test_rank_by_similarity_orders_descending() {
        let db = seeded_db();
        let ranked = db.rank_by_similarity(&[1.0, 0.0], None, 10).unwrap();
        let ids: Vec<_> = ranked.iter().map(|r| r.record.property_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert!((ranked[0].similarity - 1.0).abs() < 1e-6);
        assert!((ranked[1].similarity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_rank_by_similarity_respects_limit_and_filter() {
        let db = seeded_db();
        let metadata: QueryMetadata =
            serde_json::from_value(json!({"list_price": "<2000"})).unwrap();
        let predicate = compile(&metadata);

        let ranked = db
            .rank_by_similarity(&[1.0, 0.0], Some(&predicate), 1)
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.property_id, "p1");

        let all = db
            .rank_by_similarity(&[0.0, 1.0], Some(&predicate), 10)
            .unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.record.property_id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p1"]);
    }

    #[test]
    fn test_unembedded_rows_are_not_ranked() {
        let db = seeded_db();
        let rec = PropertyRecord::from_fields([("property_id", "p4")]).unwrap();
        db.insert_property(&rec).unwrap();

        let ranked = db.rank_by_similarity(&[1.0, 0.0], None, 10).unwrap();
        assert_eq!(ranked.len(), 3);
        let pending = db.properties_needing_embedding("test-model").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "p4");
    }

    #[test]
    fn test_model_change_requires_reembedding() {
        let db = seeded_db();
        assert!(db.properties_needing_embedding("test-model").unwrap().is_empty());
        assert_eq!(db.properties_needing_embedding("other-model").unwrap().len(), 3);
    }

    #[test]
    fn test_model_registration() {
        let db = seeded_db();
        assert!(db.check_model_compatibility("test-model", 2).unwrap());
        db.register_model("test-model", 2).unwrap();
        assert_eq!(db.get_model_dimensions("test-model").unwrap(), Some(2));
        assert!(!db.check_model_compatibility("test-model", 3).unwrap());
    }

    #[test]
    fn test_clear_embeddings_resets_registry() {
        let db = seeded_db();
        db.register_model("test-model", 2).unwrap();

        assert_eq!(db.clear_embeddings().unwrap(), 3);
        assert_eq!(db.properties_needing_embedding("test-model").unwrap().len(), 3);
        assert_eq!(db.get_model_dimensions("test-model").unwrap(), None);
        assert!(db.check_model_compatibility("test-model", 3).unwrap());
    }

    #[test]
    fn test_substring_filter_folds_non_ascii_case() {
        let db = seeded_db();
        let rec = PropertyRecord::from_fields([
            ("property_id", "p4"),
            ("neighborhoods", "ÉCOLE Quarter"),
        ])
        .unwrap();
        db.insert_property(&rec).unwrap();
        db.set_embedding("p4", "test-model", &[0.5, 0.5]).unwrap();

        let metadata: QueryMetadata =
            serde_json::from_value(json!({"neighborhoods": "école"})).unwrap();
        let predicate = compile(&metadata);

        let ranked = db
            .rank_by_similarity(&[1.0, 0.0], Some(&predicate), 20)
            .unwrap();
        let ids: Vec<_> = ranked.iter().map(|r| r.record.property_id.as_str()).collect();
        assert_eq!(ids, vec!["p4"]);
    }
}
