use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::{BeforeStoreHook, HookResult};
use crate::document::ParsedDocument;
use crate::entity::ExtractedEntity;
use crate::graph::GraphClient;
use crate::review::ReviewSession;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid dictionary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trims names, folds inner whitespace and drops entities left without a name.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer {
    title_case: bool,
}

impl TextNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also title-case names extracted entirely in lowercase.
    #[must_use]
    pub fn with_title_case(mut self, enabled: bool) -> Self {
        self.title_case = enabled;
        self
    }

    #[must_use]
    pub fn normalize(&self, name: &str) -> String {
        let folded = name.split_whitespace().collect::<Vec<_>>().join(" ");

        if self.title_case && !folded.chars().any(char::is_uppercase) {
            title_case(&folded)
        } else {
            folded
        }
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl BeforeStoreHook for TextNormalizer {
    fn name(&self) -> &str {
        "text-normalizer"
    }

    async fn before_store(
        &self,
        _document: &ParsedDocument,
        entities: Vec<ExtractedEntity>,
        _graph: &dyn GraphClient,
        _session: &dyn ReviewSession,
    ) -> HookResult<Vec<ExtractedEntity>> {
        Ok(entities
            .into_iter()
            .filter_map(|mut entity| {
                entity.name = self.normalize(&entity.name);
                (!entity.name.is_empty()).then_some(entity)
            })
            .collect())
    }
}

const DEFAULT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("US", "United States"),
    ("U.S.", "United States"),
    ("USA", "United States"),
    ("U.S.A.", "United States"),
    ("UK", "United Kingdom"),
    ("U.K.", "United Kingdom"),
    ("EU", "European Union"),
    ("UN", "United Nations"),
    ("NYC", "New York City"),
    ("FBI", "Federal Bureau of Investigation"),
    ("CIA", "Central Intelligence Agency"),
    ("SEC", "Securities and Exchange Commission"),
    ("DOJ", "Department of Justice"),
    ("IRS", "Internal Revenue Service"),
];

/// Replaces a name by its expansion when the whole name is a known
/// abbreviation (case-insensitive). Other names pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationExpander {
    table: HashMap<String, String>,
}

impl AbbreviationExpander {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::from_pairs(DEFAULT_ABBREVIATIONS.iter().copied())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut expander = Self::new();
        for (abbreviation, expansion) in pairs {
            expander.insert(abbreviation.as_ref(), expansion);
        }
        expander
    }

    /// Reads a JSON object of `"abbreviation": "expansion"` entries.
    pub fn from_json(json: &str) -> Result<Self, DictionaryError> {
        let pairs: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, DictionaryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn insert(&mut self, abbreviation: &str, expansion: impl Into<String>) {
        self.table
            .insert(abbreviation.trim().to_lowercase(), expansion.into());
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.table
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn expand<'a>(&'a self, name: &'a str) -> &'a str {
        self.lookup(name).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl BeforeStoreHook for AbbreviationExpander {
    fn name(&self) -> &str {
        "abbreviation-expander"
    }

    async fn before_store(
        &self,
        _document: &ParsedDocument,
        entities: Vec<ExtractedEntity>,
        _graph: &dyn GraphClient,
        _session: &dyn ReviewSession,
    ) -> HookResult<Vec<ExtractedEntity>> {
        Ok(entities
            .into_iter()
            .map(|mut entity| {
                if let Some(expansion) = self.lookup(&entity.name) {
                    tracing::debug!("Expanded '{}' to '{}'", entity.name, expansion);
                    entity.name = expansion.to_string();
                }
                entity
            })
            .collect())
    }
}
