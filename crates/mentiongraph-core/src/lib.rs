pub mod dedup;
pub mod document;
pub mod entity;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod ingest;
pub mod relationship;
pub mod review;

pub use dedup::{DedupEngine, DedupError, DedupReport, SimilarPair, SimilarityMetric};
pub use document::{content_hash, ParsedDocument};
pub use entity::{normalize_name, ExtractedEntity, GraphEntity};
pub use error::{Error, Result};
pub use graph::{GraphClient, MergeOutcome, SqliteGraph, Statement, StoreOutcome};
pub use hooks::{
    AbbreviationExpander, AfterBatchHook, BatchContext, BeforeStoreHook, EntityReviewHook,
    GraphDedupHook, HookError, HookRegistry, TextNormalizer,
};
pub use ingest::{
    EntityExtractor, InterruptHandle, Pipeline, PipelineConfig, PipelineError, PipelineStats,
    PlainTextLoader, RuleBasedExtractor,
};
pub use relationship::{Mention, MENTIONS};
pub use review::{ConsoleSession, NonInteractive, ReviewSession};
