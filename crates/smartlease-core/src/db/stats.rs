//! Store statistics

use super::Database;
use crate::error::Result;
use serde::Serialize;

/// Counts reported by `smartlease status`
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_properties: usize,
    pub embedded_properties: usize,
    pub pending_embeddings: usize,
    pub models: Vec<ModelUsage>,
}

/// How many rows were embedded with a given model
#[derive(Debug, Clone, Serialize)]
pub struct ModelUsage {
    pub model: String,
    pub properties: usize,
    pub dimensions: Option<usize>,
}

impl Database {
    /// Gather store statistics
    pub fn get_stats(&self) -> Result<StoreStats> {
        let total_properties = self.count_properties()?;
        let embedded_properties: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM properties WHERE embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT p.embedding_model, COUNT(*), m.dimensions
             FROM properties p
             LEFT JOIN model_metadata m ON m.model = p.embedding_model
             WHERE p.embedding IS NOT NULL AND p.embedding_model IS NOT NULL
             GROUP BY p.embedding_model
             ORDER BY p.embedding_model",
        )?;
        let models = stmt
            .query_map([], |row| {
                Ok(ModelUsage {
                    model: row.get(0)?,
                    properties: row.get::<_, i64>(1)? as usize,
                    dimensions: row.get::<_, Option<i64>>(2)?.map(|d| d as usize),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let embedded_properties = embedded_properties as usize;
        Ok(StoreStats {
            total_properties,
            embedded_properties,
            pending_embeddings: total_properties.saturating_sub(embedded_properties),
            models,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PropertyRecord;

    #[test]
    fn test_stats_counts() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        for id in ["a", "b", "c"] {
            let rec = PropertyRecord::from_fields([("property_id", id)]).unwrap();
            db.insert_property(&rec).unwrap();
        }
        db.set_embedding("a", "m1", &[1.0, 0.0]).unwrap();
        db.set_embedding("b", "m1", &[0.0, 1.0]).unwrap();
        db.register_model("m1", 2).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_properties, 3);
        assert_eq!(stats.embedded_properties, 2);
        assert_eq!(stats.pending_embeddings, 1);
        assert_eq!(stats.models.len(), 1);
        assert_eq!(stats.models[0].model, "m1");
        assert_eq!(stats.models[0].properties, 2);
        assert_eq!(stats.models[0].dimensions, Some(2));
    }
}
