use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical identity form of an entity name: lowercase, trimmed, inner
/// whitespace runs folded to a single space.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity_type: String,
    pub name: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub attributes: serde_json::Value,
}

impl ExtractedEntity {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, name: impl Into<String>, confidence: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            attributes: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attrs: serde_json::Value) -> Self {
        self.attributes = attrs;
        self
    }

    #[must_use]
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEntity {
    pub namespace: String,
    pub entity_type: String,
    pub name: String,
    pub normalized_name: String,
    pub created_at: DateTime<Utc>,
}

impl GraphEntity {
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        entity_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            namespace: namespace.into(),
            entity_type: entity_type.into(),
            normalized_name: normalize_name(&name),
            name,
            created_at: Utc::now(),
        }
    }

    /// `(entity_type, normalized_name)`, unique within a namespace.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.entity_type, &self.normalized_name)
    }

    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.key() == other.key()
    }

    pub(crate) fn name_len(&self) -> usize {
        self.name.chars().count()
    }
}

impl PartialEq for GraphEntity {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl std::fmt::Display for GraphEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.entity_type)
    }
}
