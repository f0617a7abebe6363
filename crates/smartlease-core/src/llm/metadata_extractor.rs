//! Query metadata extraction
//!
//! One chat call turns a free-text rental query into a [`QueryMetadata`]
//! mapping restricted to the searchable fields. Extraction never fails the
//! request: anything unusable comes back as [`ExtractedMetadata::Unparsed`].

use super::{json_object_span, ChatMessage, LLMClient};
use crate::search::{MetadataField, QueryMetadata};
use serde::Serialize;
use std::sync::Arc;

/// Result of metadata extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedMetadata {
    Parsed(QueryMetadata),
    /// The model's reply could not be read as a JSON object
    Unparsed { error: String, raw_content: String },
}

impl ExtractedMetadata {
    /// Metadata to filter on. Unparsed output filters on nothing.
    pub fn metadata(&self) -> QueryMetadata {
        match self {
            ExtractedMetadata::Parsed(m) => m.clone(),
            ExtractedMetadata::Unparsed { .. } => QueryMetadata::default(),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ExtractedMetadata::Parsed(_))
    }
}

/// Extracts filterable fields from a query using a chat model
pub struct MetadataExtractor {
    client: Arc<dyn LLMClient>,
    temperature: f32,
}

impl MetadataExtractor {
    pub fn new(client: Arc<dyn LLMClient>, temperature: f32) -> Self {
        Self {
            client,
            temperature,
        }
    }

    /// Extract metadata from a query (single call, no retry)
    pub async fn extract(&self, query: &str) -> ExtractedMetadata {
        let messages = vec![
            ChatMessage::system(
                "You extract search filters from real estate rental queries. \
                 Respond ONLY with a JSON object.",
            ),
            ChatMessage::user(build_extraction_prompt(query)),
        ];

        match self.client.chat_completion(messages, self.temperature).await {
            Ok(response) => parse_metadata_response(&response),
            Err(e) => {
                tracing::warn!("Metadata extraction call failed: {}", e);
                ExtractedMetadata::Unparsed {
                    error: format!("LLM call failed: {}", e),
                    raw_content: String::new(),
                }
            }
        }
    }
}

fn build_extraction_prompt(query: &str) -> String {
    let fields: Vec<&str> = MetadataField::ALL.iter().map(|f| f.column()).collect();
    format!(
        r#"Extract the following fields from the real estate search query below.
Only return the fields that are mentioned, as a JSON object.
Use a string starting with "<" or ">" for upper or lower bounds (e.g. "<2000").

Fields: {}
Query: "{}"

JSON:"#,
        fields.join(", "),
        query
    )
}

/// Parse a model reply into metadata, keeping only allow-listed keys
pub fn parse_metadata_response(response: &str) -> ExtractedMetadata {
    let unparsed = |error: String| ExtractedMetadata::Unparsed {
        error,
        raw_content: response.to_string(),
    };

    let Some(json_str) = json_object_span(response) else {
        return unparsed("Could not parse response: no JSON object found".to_string());
    };

    match serde_json::from_str::<serde_json::Value>(json_str) {
        Ok(serde_json::Value::Object(object)) => {
            ExtractedMetadata::Parsed(QueryMetadata::from_json_object(&object))
        }
        Ok(_) => unparsed("Could not parse response: not a JSON object".to_string()),
        Err(e) => unparsed(format!("Could not parse response: {}", e)),
    }
}
