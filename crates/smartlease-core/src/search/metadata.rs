//! Structured query metadata

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Fields the metadata extractor may fill in.
///
/// Each variant maps to exactly one store column, so filter SQL never takes
/// an identifier from model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    Address,
    Beds,
    FullBaths,
    Sqft,
    ListPrice,
    Neighborhoods,
    NearbySchools,
}

impl MetadataField {
    pub const ALL: [MetadataField; 7] = [
        MetadataField::Address,
        MetadataField::Beds,
        MetadataField::FullBaths,
        MetadataField::Sqft,
        MetadataField::ListPrice,
        MetadataField::Neighborhoods,
        MetadataField::NearbySchools,
    ];

    /// Store column backing this field
    pub fn column(self) -> &'static str {
        match self {
            MetadataField::Address => "address",
            MetadataField::Beds => "beds",
            MetadataField::FullBaths => "full_baths",
            MetadataField::Sqft => "sqft",
            MetadataField::ListPrice => "list_price",
            MetadataField::Neighborhoods => "neighborhoods",
            MetadataField::NearbySchools => "nearby_schools",
        }
    }

    /// Look up a field by key (case-insensitive). Unknown keys give `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.column() == key)
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Field/value mapping extracted from a free-text query.
///
/// Deserializing silently drops keys outside [`MetadataField`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, Value>"
)]
pub struct QueryMetadata {
    fields: BTreeMap<MetadataField, Value>,
}

impl QueryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the allow-listed keys of a JSON object
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .filter_map(|(k, v)| MetadataField::from_key(k).map(|f| (f, v.clone())))
            .collect();
        Self { fields }
    }

    pub fn insert(&mut self, field: MetadataField, value: impl Into<Value>) {
        self.fields.insert(field, value.into());
    }

    pub fn get(&self, field: MetadataField) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetadataField, &Value)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for QueryMetadata {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let fields = raw
            .into_iter()
            .filter_map(|(k, v)| MetadataField::from_key(&k).map(|f| (f, v)))
            .collect();
        Self { fields }
    }
}

impl From<QueryMetadata> for BTreeMap<String, Value> {
    fn from(metadata: QueryMetadata) -> Self {
        metadata
            .fields
            .into_iter()
            .map(|(f, v)| (f.column().to_string(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_key() {
        assert_eq!(MetadataField::from_key("list_price"), Some(MetadataField::ListPrice));
        assert_eq!(MetadataField::from_key(" Beds "), Some(MetadataField::Beds));
        assert_eq!(MetadataField::from_key("pets_allowed"), None);
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let metadata: QueryMetadata = serde_json::from_value(json!({
            "beds": 2,
            "parking": "yes",
            "address": "Boston"
        }))
        .unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get(MetadataField::Beds), Some(&json!(2)));
        assert!(metadata.iter().all(|(f, _)| f != MetadataField::ListPrice));
    }

    #[test]
    fn test_serializes_with_column_names() {
        let mut metadata = QueryMetadata::new();
        metadata.insert(MetadataField::ListPrice, "<2000");
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value, json!({"list_price": "<2000"}));
    }
}
