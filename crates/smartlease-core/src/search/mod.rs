//! Search engine module
//!
//! Provides:
//! - Structured query metadata and its compilation into SQL filters
//! - Hybrid retrieval over a semantic and a keyword-filtered pool
//! - The end-to-end search pipeline with optional step snapshots

mod filter;
mod hybrid;
mod metadata;
mod pipeline;
mod step_log;

pub use filter::{compile, extract_number, is_falsy, Clause, Comparison, Predicate, SqlFragment};
pub use hybrid::{merge_and_rank, CandidateResult, HybridRetriever, RetrievalPath};
pub use metadata::{MetadataField, QueryMetadata};
pub use pipeline::{SearchOptions, SearchPipeline, SearchReport};
pub use step_log::{StepLog, FINAL_RESULTS_FILE, METADATA_FILE, SEARCH_RESULTS_FILE};
