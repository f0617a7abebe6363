//! LLM re-ranking of retrieved properties
//!
//! The top candidates and the user's query go to a chat model, which orders
//! them and writes pros, cons and a one-line suggestion for each. Malformed
//! replies come back as [`RerankOutcome::Failed`] with the raw text attached.

use super::{json_object_span, ChatMessage, LLMClient};
use crate::search::CandidateResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Property attributes shown to the ranking model
pub const RERANK_FIELDS: &[&str] = &[
    "property_id",
    "address",
    "beds",
    "full_baths",
    "sqft",
    "list_price",
    "nearby_schools",
    "neighborhoods",
    "complete_property_details",
];

/// One property as ranked by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProperty {
    #[serde(deserialize_with = "string_or_number")]
    pub property_id: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub suggestion: String,
}

/// Outcome of re-ranking. Serializes to the response body as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RerankOutcome {
    Ranked {
        ranked_properties: Vec<RankedProperty>,
    },
    Failed {
        error: String,
        raw_response: String,
    },
}

impl RerankOutcome {
    pub fn is_ranked(&self) -> bool {
        matches!(self, RerankOutcome::Ranked { .. })
    }
}

/// Re-ranks candidates with a chat model
pub struct PropertyRanker {
    client: Arc<dyn LLMClient>,
    temperature: f32,
    max_candidates: usize,
}

impl PropertyRanker {
    pub fn new(client: Arc<dyn LLMClient>, temperature: f32, max_candidates: usize) -> Self {
        Self {
            client,
            temperature,
            max_candidates,
        }
    }

    /// Rank the first `max_candidates` candidates for `query`
    pub async fn rerank(&self, query: &str, candidates: &[CandidateResult]) -> RerankOutcome {
        let candidates = &candidates[..candidates.len().min(self.max_candidates)];
        if candidates.is_empty() {
            return RerankOutcome::Ranked {
                ranked_properties: Vec::new(),
            };
        }

        let projected: Vec<serde_json::Value> = candidates.iter().map(project).collect();
        let listing = match serde_json::to_string_pretty(&projected) {
            Ok(listing) => listing,
            Err(e) => {
                return RerankOutcome::Failed {
                    error: format!("Failed to serialize candidates: {}", e),
                    raw_response: String::new(),
                }
            }
        };

        let messages = vec![
            ChatMessage::system(
                "You are a real estate assistant helping a user choose a rental property. \
                 Respond ONLY with a JSON object.",
            ),
            ChatMessage::user(build_rerank_prompt(query, candidates.len(), &listing)),
        ];

        let response = match self.client.chat_completion(messages, self.temperature).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Re-ranking call failed: {}", e);
                return RerankOutcome::Failed {
                    error: format!("LLM call failed: {}", e),
                    raw_response: String::new(),
                };
            }
        };

        let known: Vec<&str> = candidates
            .iter()
            .map(|c| c.record.property_id.as_str())
            .collect();
        parse_rerank_response(&response, &known)
    }
}

fn project(candidate: &CandidateResult) -> serde_json::Value {
    let object = RERANK_FIELDS
        .iter()
        .map(|field| {
            (
                field.to_string(),
                serde_json::Value::String(candidate.record.get(field).to_string()),
            )
        })
        .collect();
    serde_json::Value::Object(object)
}

fn build_rerank_prompt(query: &str, count: usize, listing: &str) -> String {
    format!(
        r#"Query: "{query}"

You are given {count} candidate properties. RANK them by how well they fit the user's intent.
For each property provide:
- 2 pros
- 2 cons
- A 1-line suggestion

Properties:
{listing}

Return a JSON object in this format:
{{
  "ranked_properties": [
    {{
      "property_id": "...",
      "pros": ["...", "..."],
      "cons": ["...", "..."],
      "suggestion": "..."
    }}
  ]
}}"#
    )
}

/// Parse a ranking reply. Entries for ids outside `known_ids` are dropped,
/// as are repeats of an id already ranked.
pub fn parse_rerank_response(response: &str, known_ids: &[&str]) -> RerankOutcome {
    #[derive(Deserialize)]
    struct RerankReply {
        ranked_properties: Vec<RankedProperty>,
    }

    let failed = |error: String| RerankOutcome::Failed {
        error,
        raw_response: response.to_string(),
    };

    let Some(json_str) = json_object_span(response) else {
        return failed("Failed to parse LLM output: no JSON object found".to_string());
    };

    let reply: RerankReply = match serde_json::from_str(json_str) {
        Ok(reply) => reply,
        Err(e) => return failed(format!("Failed to parse LLM output: {}", e)),
    };

    let known: HashSet<&str> = known_ids.iter().copied().collect();
    let mut seen = HashSet::new();
    let ranked_properties = reply
        .ranked_properties
        .into_iter()
        .filter(|p| {
            if !known.contains(p.property_id.as_str()) {
                tracing::warn!("Dropping ranked property {} not among candidates", p.property_id);
                return false;
            }
            seen.insert(p.property_id.clone())
        })
        .collect();

    RerankOutcome::Ranked { ranked_properties }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
