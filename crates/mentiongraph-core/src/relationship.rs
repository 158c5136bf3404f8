use serde::{Deserialize, Serialize};

/// Label of the document -> entity edge.
pub const MENTIONS: &str = "MENTIONS";

/// A `MENTIONS` edge from a document to an entity. Properties travel with the
/// edge when its target is merged into another entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub namespace: String,
    pub doc_id: String,
    pub entity_type: String,
    pub normalized_name: String,
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl Mention {
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.properties.get("confidence").and_then(serde_json::Value::as_f64)
    }
}

/// Edge properties written for a freshly stored mention.
pub(crate) fn mention_properties(confidence: f64, attributes: &serde_json::Value) -> serde_json::Value {
    let mut props = serde_json::Map::new();
    props.insert("confidence".into(), serde_json::json!(confidence));
    if let serde_json::Value::Object(extra) = attributes {
        for (k, v) in extra {
            props.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    serde_json::Value::Object(props)
}
