//! LLM integration
//!
//! Provides traits and implementations for:
//! - Embedding generation via external services (vLLM, OpenAI, etc.)
//! - Query metadata extraction
//! - Property re-ranking with pros/cons

mod cache;
mod client;
mod http_embedder;
mod metadata_extractor;
mod property_ranker;
mod traits;

pub use client::{ChatMessage, LLMClient, VLLMClient};
pub use http_embedder::HttpEmbedder;
pub use metadata_extractor::{parse_metadata_response, ExtractedMetadata, MetadataExtractor};
pub use property_ranker::{
    parse_rerank_response, PropertyRanker, RankedProperty, RerankOutcome, RERANK_FIELDS,
};
pub use traits::*;

/// Slice from the first `{` to the last `}`, tolerating prose and code fences
/// around the object. `None` when there is no such span.
pub(crate) fn json_object_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}
