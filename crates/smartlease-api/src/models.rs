use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// New listing from the intake form. Any JSON scalar is accepted per field.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct AddPropertyRequest {
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl AddPropertyRequest {
    /// Field pairs as stored text. The form's `baths` maps to `full_baths`.
    pub fn into_fields(self) -> Vec<(String, String)> {
        self.fields
            .into_iter()
            .map(|(key, value)| {
                let key = if key.trim().eq_ignore_ascii_case("baths") {
                    "full_baths".to_string()
                } else {
                    key
                };
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddPropertyResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub properties: usize,
}
