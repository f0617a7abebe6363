//! Hybrid retrieval: semantic pool + keyword-filtered pool
//!
//! Both pools are ranked by cosine similarity to one query embedding. Rows
//! from the filtered pool win deduplication and carry an additive boost, so
//! keyword matches outrank equally similar semantic-only rows.

use super::filter::Predicate;
use crate::config::SearchConfig;
use crate::db::{DatabasePool, PropertyRecord, ScoredProperty};
use crate::error::{Result, SmartLeaseError};
use crate::llm::Embedder;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Which pool a candidate was kept from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalPath {
    Filtered,
    Semantic,
}

/// A retrieved property with its scores
#[derive(Debug, Clone, Serialize)]
pub struct CandidateResult {
    #[serde(flatten)]
    pub record: PropertyRecord,
    pub similarity: f64,
    pub source: RetrievalPath,
    pub final_score: f64,
}

/// Runs both retrieval queries and merges them
pub struct HybridRetriever {
    pool: DatabasePool,
    embedder: Arc<dyn Embedder>,
    config: SearchConfig,
}

impl HybridRetriever {
    pub fn new(pool: DatabasePool, embedder: Arc<dyn Embedder>, config: SearchConfig) -> Self {
        Self {
            pool,
            embedder,
            config,
        }
    }

    /// Retrieve at most `final_k` candidates for `query`.
    ///
    /// An empty predicate makes the filtered pool the plain top-N by
    /// similarity. Embedding or store failures abort with
    /// [`SmartLeaseError::Retrieval`].
    pub async fn retrieve(&self, query: &str, predicate: &Predicate) -> Result<Vec<CandidateResult>> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| SmartLeaseError::retrieval("query embedding", e))?;

        let db = self
            .pool
            .acquire()
            .await
            .map_err(|e| SmartLeaseError::retrieval("store connection", e))?;

        // Both rankings scan every stored vector; keep them off the runtime threads
        let predicate_owned = predicate.clone();
        let (filtered_limit, semantic_limit) = (self.config.filtered_pool, self.config.semantic_pool);
        let (filtered, semantic) = tokio::task::spawn_blocking(move || {
            let filtered = db
                .rank_by_similarity(&embedding, Some(&predicate_owned), filtered_limit)
                .map_err(|e| SmartLeaseError::retrieval("filtered query", e))?;
            let semantic = db
                .rank_by_similarity(&embedding, None, semantic_limit)
                .map_err(|e| SmartLeaseError::retrieval("semantic query", e))?;
            Ok::<_, SmartLeaseError>((filtered, semantic))
        })
        .await
        .map_err(|e| {
            SmartLeaseError::retrieval("store query", anyhow::anyhow!("ranking task failed: {}", e))
        })??;

        tracing::debug!(
            "Retrieved {} filtered and {} semantic rows (filter: {})",
            filtered.len(),
            semantic.len(),
            if predicate.is_empty() {
                "none".to_string()
            } else {
                predicate.to_string()
            }
        );

        Ok(merge_and_rank(
            filtered,
            semantic,
            self.config.keyword_boost,
            self.config.final_k,
        ))
    }
}

/// Merge filtered-first, dedupe by id (first occurrence wins), boost filtered
/// rows, stable-sort by final score descending and keep the top `k`.
pub fn merge_and_rank(
    filtered: Vec<ScoredProperty>,
    semantic: Vec<ScoredProperty>,
    keyword_boost: f64,
    k: usize,
) -> Vec<CandidateResult> {
    let mut seen = HashSet::new();

    let tagged = filtered
        .into_iter()
        .map(|row| (row, RetrievalPath::Filtered))
        .chain(semantic.into_iter().map(|row| (row, RetrievalPath::Semantic)));

    let mut merged: Vec<CandidateResult> = tagged
        .filter(|(row, _)| seen.insert(row.record.property_id.clone()))
        .map(|(row, source)| {
            let boost = match source {
                RetrievalPath::Filtered => keyword_boost,
                RetrievalPath::Semantic => 0.0,
            };
            CandidateResult {
                final_score: row.similarity + boost,
                similarity: row.similarity,
                record: row.record,
                source,
            }
        })
        .collect();

    merged.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    merged.truncate(k);
    merged
}
