use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const ENV_PREFIX: &str = "MENTIONGRAPH_";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Namespace must not be empty")]
    EmptyNamespace,
    #[error("{field} must be at least 1")]
    NotPositive { field: &'static str },
    #[error("min_confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),
    #[error("Invalid value for {var}: '{value}'")]
    InvalidVar { var: String, value: String },
}

/// Settings for one pipeline run. Not changed once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Graph partition the run writes into and deduplicates within
    pub namespace: String,
    pub source_dir: PathBuf,
    /// Allowed entity types, compared case-insensitively. `None` keeps all.
    pub entity_types: Option<Vec<String>>,
    /// Entities below this confidence are dropped before any hook sees them
    pub min_confidence: f64,
    /// Skip documents whose content hash is already stored in the namespace
    pub skip_processed: bool,
    pub batch_size: usize,
    /// Consecutive document failures that abort the run
    pub max_failures: usize,
    pub interactive: bool,
    /// Run extraction and hooks without writing to the graph
    pub dry_run: bool,
    /// Documents of a batch extracted at the same time
    pub extract_concurrency: usize,
    /// Errors logged verbatim at the end of a run; the rest are only counted
    pub error_report_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            source_dir: PathBuf::from("documents"),
            entity_types: None,
            min_confidence: 0.0,
            skip_processed: true,
            batch_size: 10,
            max_failures: 5,
            interactive: false,
            dry_run: false,
            extract_concurrency: 1,
            error_report_limit: 10,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn new(namespace: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_entity_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    #[must_use]
    pub fn with_skip_processed(mut self, skip: bool) -> Self {
        self.skip_processed = skip;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_max_failures(mut self, max_failures: usize) -> Self {
        self.max_failures = max_failures;
        self
    }

    #[must_use]
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_extract_concurrency(mut self, concurrency: usize) -> Self {
        self.extract_concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_error_report_limit(mut self, limit: usize) -> Self {
        self.error_report_limit = limit;
        self
    }

    /// Defaults overridden by any `MENTIONGRAPH_*` variable that is set.
    ///
    /// `MENTIONGRAPH_ENTITY_TYPES` is comma-separated; booleans accept
    /// `1`/`true`/`yes` and `0`/`false`/`no`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| {
            let name = format!("{ENV_PREFIX}{key}");
            var(&name).map(|value| (name, value))
        };

        if let Some((_, v)) = get("NAMESPACE") {
            config.namespace = v;
        }
        if let Some((_, v)) = get("SOURCE_DIR") {
            config.source_dir = PathBuf::from(v);
        }
        if let Some((_, v)) = get("ENTITY_TYPES") {
            let types: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
            config.entity_types = (!types.is_empty()).then_some(types);
        }
        if let Some((name, v)) = get("MIN_CONFIDENCE") {
            config.min_confidence = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("SKIP_PROCESSED") {
            config.skip_processed = parse_bool(&name, &v)?;
        }
        if let Some((name, v)) = get("BATCH_SIZE") {
            config.batch_size = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("MAX_FAILURES") {
            config.max_failures = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("INTERACTIVE") {
            config.interactive = parse_bool(&name, &v)?;
        }
        if let Some((name, v)) = get("DRY_RUN") {
            config.dry_run = parse_bool(&name, &v)?;
        }
        if let Some((name, v)) = get("EXTRACT_CONCURRENCY") {
            config.extract_concurrency = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("ERROR_REPORT_LIMIT") {
            config.error_report_limit = parse_var(&name, &v)?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::NotPositive { field: "batch_size" });
        }
        if self.max_failures == 0 {
            return Err(ConfigError::NotPositive { field: "max_failures" });
        }
        if self.extract_concurrency == 0 {
            return Err(ConfigError::NotPositive {
                field: "extract_concurrency",
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::ConfidenceOutOfRange(self.min_confidence));
        }
        Ok(())
    }

    /// Whether an entity type passes the allow-list.
    pub fn allows_type(&self, entity_type: &str) -> bool {
        self.entity_types.as_ref().map_or(true, |types| {
            types.iter().any(|t| t.eq_ignore_ascii_case(entity_type))
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidVar {
        var: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidVar {
            var: name.to_string(),
            value: value.to_string(),
        }),
    }
}
