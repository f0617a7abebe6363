//! End-to-end search: extract, compile, retrieve, re-rank

use super::filter::{compile, Predicate};
use super::hybrid::{CandidateResult, HybridRetriever};
use super::step_log::StepLog;
use crate::config::Config;
use crate::db::DatabasePool;
use crate::error::{Result, SmartLeaseError};
use crate::llm::{
    Embedder, ExtractedMetadata, LLMClient, MetadataExtractor, PropertyRanker, RerankOutcome,
};
use std::sync::Arc;
use tokio::time::Instant;

/// Per-call switches
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Run the LLM re-ranking stage
    pub rerank: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { rerank: true }
    }
}

/// Everything a search produced, stage by stage
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub metadata: ExtractedMetadata,
    pub predicate: Predicate,
    pub candidates: Vec<CandidateResult>,
    /// `None` when re-ranking was switched off
    pub outcome: Option<RerankOutcome>,
}

/// Wires the four stages together for one request at a time.
/// Cheap to share behind an `Arc`; every call is independent.
pub struct SearchPipeline {
    extractor: MetadataExtractor,
    retriever: HybridRetriever,
    ranker: PropertyRanker,
    step_log: StepLog,
}

impl SearchPipeline {
    pub fn new(
        config: &Config,
        pool: DatabasePool,
        chat: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let search = &config.search;
        Self {
            extractor: MetadataExtractor::new(chat.clone(), search.extraction_temperature),
            retriever: HybridRetriever::new(pool, embedder, search.clone()),
            ranker: PropertyRanker::new(chat, search.rerank_temperature, search.rerank_candidates),
            step_log: StepLog::new(search.step_log_dir.clone()),
        }
    }

    pub fn step_log(&self) -> &StepLog {
        &self.step_log
    }

    /// Run the full chain and return the re-ranking outcome
    pub async fn search(&self, query: &str) -> Result<RerankOutcome> {
        let report = self.search_with(query, SearchOptions::default()).await?;
        report
            .outcome
            .ok_or_else(|| SmartLeaseError::Other(anyhow::anyhow!("re-ranking did not run")))
    }

    /// Run the full chain, giving up at `deadline`.
    ///
    /// Callers that queue before searching pass the deadline they started
    /// with, so queueing and searching share one budget.
    pub async fn search_until(&self, query: &str, deadline: Instant) -> Result<RerankOutcome> {
        let started = Instant::now();
        match tokio::time::timeout_at(deadline, self.search(query)).await {
            Ok(result) => result,
            Err(_) => {
                let waited = started.elapsed();
                tracing::warn!("Search timed out after {:?}", waited);
                Err(SmartLeaseError::Timeout(waited.as_secs()))
            }
        }
    }

    /// Run the chain with options, keeping every intermediate stage
    pub async fn search_with(&self, query: &str, options: SearchOptions) -> Result<SearchReport> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SmartLeaseError::InvalidInput("query must not be empty".to_string()));
        }

        tracing::info!("Searching: {}", query);

        let metadata = self.extractor.extract(query).await;
        if let ExtractedMetadata::Unparsed { error, .. } = &metadata {
            tracing::warn!("Metadata extraction unusable, searching without filters: {}", error);
        }
        self.step_log.record_metadata(query, &metadata);

        let predicate = compile(&metadata.metadata());
        tracing::debug!("Compiled filter: {}", predicate);

        let candidates = self.retriever.retrieve(query, &predicate).await?;
        self.step_log.record_search_results(&candidates);
        tracing::info!("Retrieved {} candidates", candidates.len());

        let outcome = if options.rerank {
            let outcome = self.ranker.rerank(query, &candidates).await;
            if let RerankOutcome::Failed { error, .. } = &outcome {
                tracing::warn!("Re-ranking output unusable: {}", error);
            }
            self.step_log.record_final_results(&outcome);
            Some(outcome)
        } else {
            None
        };

        Ok(SearchReport {
            metadata,
            predicate,
            candidates,
            outcome,
        })
    }
}
