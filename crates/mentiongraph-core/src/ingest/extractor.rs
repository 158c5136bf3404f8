use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

use crate::document::ParsedDocument;
use crate::entity::ExtractedEntity;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction failed: {0}")]
    Failed(String),
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Context too long: {0} characters (max: {1})")]
    ContextTooLong(usize, usize),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Turns document text into typed entity mentions. Failures are reported
/// per document and never end a pipeline run by themselves.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, document: &ParsedDocument) -> ExtractionResult<Vec<ExtractedEntity>>;
}

pub struct ExtractionPattern {
    pub entity_type: String,
    pub regex: regex::Regex,
    pub confidence: f64,
}

impl ExtractionPattern {
    /// When the pattern has a capture group, group 1 is the entity name;
    /// otherwise the whole match is.
    pub fn new(
        entity_type: impl Into<String>,
        pattern: &str,
        confidence: f64,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            entity_type: entity_type.into(),
            regex: regex::Regex::new(pattern)?,
            confidence,
        })
    }
}

/// Regex-driven extractor. Each distinct `(type, normalized name)` is
/// reported once per document, at its first occurrence.
#[derive(Default)]
pub struct RuleBasedExtractor {
    patterns: Vec<ExtractionPattern>,
}

impl RuleBasedExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: ExtractionPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Email addresses and the organization behind web addresses.
    #[must_use]
    pub fn with_default_patterns() -> Self {
        let mut extractor = Self::new();

        let email_pattern = ExtractionPattern::new(
            "Email",
            r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
            0.6,
        );

        let url_pattern = ExtractionPattern::new(
            "Organization",
            r"https?://(?:www\.)?([a-zA-Z0-9-]+)\.(?:com|org|net|gov|edu)(?:/[^\s]*)?",
            0.5,
        );

        if let Ok(p) = email_pattern {
            extractor.patterns.push(p);
        }
        if let Ok(p) = url_pattern {
            extractor.patterns.push(p);
        }

        extractor
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

#[async_trait]
impl EntityExtractor for RuleBasedExtractor {
    async fn extract(&self, document: &ParsedDocument) -> ExtractionResult<Vec<ExtractedEntity>> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        for pattern in &self.patterns {
            for captures in pattern.regex.captures_iter(&document.text) {
                let Some(found) = captures.get(1).or_else(|| captures.get(0)) else {
                    continue;
                };

                let entity = ExtractedEntity::new(
                    pattern.entity_type.as_str(),
                    found.as_str(),
                    pattern.confidence,
                )
                .with_attributes(serde_json::json!({
                    "start": found.start(),
                    "end": found.end(),
                }));

                if seen.insert((entity.entity_type.clone(), entity.normalized_name())) {
                    entities.push(entity);
                }
            }
        }

        Ok(entities)
    }
}

/// Concatenates the output of several extractors; the first error wins.
#[derive(Default)]
pub struct CompositeExtractor {
    extractors: Vec<Box<dyn EntityExtractor>>,
}

impl CompositeExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn EntityExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn add_extractor(&mut self, extractor: Box<dyn EntityExtractor>) {
        self.extractors.push(extractor);
    }
}

#[async_trait]
impl EntityExtractor for CompositeExtractor {
    async fn extract(&self, document: &ParsedDocument) -> ExtractionResult<Vec<ExtractedEntity>> {
        let mut combined = Vec::new();

        for extractor in &self.extractors {
            combined.extend(extractor.extract(document).await?);
        }

        Ok(combined)
    }
}
