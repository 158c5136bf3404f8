mod config;
mod extractor;
mod loader;
mod pipeline;
mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use extractor::{
    CompositeExtractor, EntityExtractor, ExtractionError, ExtractionPattern, ExtractionResult,
    RuleBasedExtractor,
};
pub use loader::{DocumentLoader, LoadError, LoadResult, PlainTextLoader};
pub use pipeline::{DocumentError, InterruptHandle, Pipeline, PipelineError, SetupError};
pub use stats::PipelineStats;
