//! SmartLease Core Library
//!
//! Core functionality for the smartlease rental property search engine.
//!
//! # Features
//! - SQLite property store with embeddings kept next to each listing
//! - LLM extraction of structured filters from free-text queries
//! - Parameterized keyword filters compiled from that metadata
//! - Hybrid retrieval merging semantic and filtered cosine rankings
//! - LLM re-ranking with pros, cons and a suggestion per property

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod search;

pub use config::{Config, LLMServiceConfig, SearchConfig, ServerConfig, StoreConfig};
pub use db::{Database, DatabasePool, PooledDatabase, PropertyRecord, StoreStats, UpsertOutcome};
pub use error::{Error, Result, SmartLeaseError};
pub use ingest::{add_property, embed_pending, ingest_records, IngestStats};
pub use llm::{
    ChatMessage, Embedder, ExtractedMetadata, HttpEmbedder, LLMClient, MetadataExtractor,
    PropertyRanker, RankedProperty, RerankOutcome, VLLMClient,
};
pub use search::{
    compile, CandidateResult, HybridRetriever, MetadataField, Predicate, QueryMetadata,
    RetrievalPath, SearchOptions, SearchPipeline, SearchReport,
};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "smartlease";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "smartlease";
