mod dedup;
mod normalize;
mod review;

use async_trait::async_trait;
use thiserror::Error;

use crate::dedup::DedupError;
use crate::document::ParsedDocument;
use crate::entity::ExtractedEntity;
use crate::graph::GraphClient;
use crate::review::ReviewSession;

pub use dedup::GraphDedupHook;
pub use normalize::{AbbreviationExpander, DictionaryError, TextNormalizer};
pub use review::EntityReviewHook;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook {hook} failed: {message}")]
    Failed { hook: String, message: String },
    #[error("Graph error: {0}")]
    Graph(#[from] crate::Error),
    #[error("Deduplication error: {0}")]
    Dedup(#[from] DedupError),
}

impl HookError {
    pub fn failed(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Whether the hook failed because the graph backend went away.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::Graph(e) | Self::Dedup(DedupError::Graph(e)) => e.is_connection_lost(),
            Self::Failed { .. } | Self::Dedup(_) => false,
        }
    }
}

pub type HookResult<T> = Result<T, HookError>;

/// What an after-batch hook knows about the batch it runs for.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub namespace: String,
    pub dry_run: bool,
    pub batch_index: usize,
}

#[async_trait]
pub trait BeforeStoreHook: Send + Sync {
    fn name(&self) -> &str;

    /// Returning an empty list keeps the document's entities away from every
    /// later hook and from storage.
    async fn before_store(
        &self,
        document: &ParsedDocument,
        entities: Vec<ExtractedEntity>,
        graph: &dyn GraphClient,
        session: &dyn ReviewSession,
    ) -> HookResult<Vec<ExtractedEntity>>;
}

#[async_trait]
pub trait AfterBatchHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after_batch(
        &self,
        entities: &[ExtractedEntity],
        graph: &dyn GraphClient,
        session: &dyn ReviewSession,
        ctx: &BatchContext,
    ) -> HookResult<()>;
}

/// Before-store hooks chain per document; after-batch hooks run once per
/// settled batch. Both lists run in registration order.
#[derive(Default)]
pub struct HookRegistry {
    before_store: Vec<Box<dyn BeforeStoreHook>>,
    after_batch: Vec<Box<dyn AfterBatchHook>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_before_store(&mut self, hook: Box<dyn BeforeStoreHook>) -> &mut Self {
        self.before_store.push(hook);
        self
    }

    pub fn register_after_batch(&mut self, hook: Box<dyn AfterBatchHook>) -> &mut Self {
        self.after_batch.push(hook);
        self
    }

    #[must_use]
    pub fn with_before_store(mut self, hook: Box<dyn BeforeStoreHook>) -> Self {
        self.before_store.push(hook);
        self
    }

    #[must_use]
    pub fn with_after_batch(mut self, hook: Box<dyn AfterBatchHook>) -> Self {
        self.after_batch.push(hook);
        self
    }

    pub fn before_store_names(&self) -> Vec<&str> {
        self.before_store.iter().map(|h| h.name()).collect()
    }

    pub fn after_batch_names(&self) -> Vec<&str> {
        self.after_batch.iter().map(|h| h.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.before_store.is_empty() && self.after_batch.is_empty()
    }

    /// Threads `entities` through every before-store hook in registration
    /// order. The first failing hook ends the chain.
    pub async fn run_before_store(
        &self,
        document: &ParsedDocument,
        mut entities: Vec<ExtractedEntity>,
        graph: &dyn GraphClient,
        session: &dyn ReviewSession,
    ) -> HookResult<Vec<ExtractedEntity>> {
        for hook in &self.before_store {
            let before = entities.len();
            entities = hook.before_store(document, entities, graph, session).await?;
            tracing::debug!(
                "Hook {} on {}: {} -> {} entities",
                hook.name(),
                document.doc_id,
                before,
                entities.len()
            );
        }

        Ok(entities)
    }

    /// Runs every after-batch hook. A failing hook does not stop the ones
    /// registered after it; failures are returned with the hook's name.
    pub async fn run_after_batch(
        &self,
        entities: &[ExtractedEntity],
        graph: &dyn GraphClient,
        session: &dyn ReviewSession,
        ctx: &BatchContext,
    ) -> Vec<(String, HookError)> {
        let mut failures = Vec::new();

        for hook in &self.after_batch {
            if let Err(e) = hook.after_batch(entities, graph, session, ctx).await {
                tracing::warn!(
                    "After-batch hook {} failed on batch {}: {}",
                    hook.name(),
                    ctx.batch_index,
                    e
                );
                failures.push((hook.name().to_string(), e));
            }
        }

        failures
    }
}
