use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use super::config::{ConfigError, PipelineConfig};
use super::extractor::{EntityExtractor, ExtractionError, ExtractionResult};
use super::loader::{DocumentLoader, LoadError, PlainTextLoader};
use super::stats::PipelineStats;
use crate::document::ParsedDocument;
use crate::entity::ExtractedEntity;
use crate::graph::{GraphClient, StoreOutcome};
use crate::hooks::{BatchContext, HookError, HookRegistry};
use crate::review::{ConsoleSession, NonInteractive, ReviewSession};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Graph unavailable: {0}")]
    Graph(#[from] crate::Error),
    #[error("Could not load documents: {0}")]
    Load(#[from] LoadError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),
    #[error("Aborted after {consecutive} consecutive document failures")]
    TooManyFailures {
        consecutive: usize,
        stats: Box<PipelineStats>,
    },
    #[error("Graph connection lost: {message}")]
    ConnectionLost {
        message: String,
        stats: Box<PipelineStats>,
    },
    #[error("Interrupted")]
    Interrupted { stats: Box<PipelineStats> },
}

impl PipelineError {
    /// Counters at the point of abort. Setup failures happen before any
    /// document is touched and carry none.
    pub fn stats(&self) -> Option<&PipelineStats> {
        match self {
            Self::Setup(_) => None,
            Self::TooManyFailures { stats, .. }
            | Self::ConnectionLost { stats, .. }
            | Self::Interrupted { stats } => Some(stats),
        }
    }
}

/// Why a single document failed. Recorded, never raised on its own.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("{0}")]
    Hook(#[from] HookError),
    #[error("Write error: {0}")]
    Store(#[from] crate::Error),
}

impl DocumentError {
    fn is_connection_lost(&self) -> bool {
        match self {
            Self::Store(e) => e.is_connection_lost(),
            Self::Hook(e) => e.is_connection_lost(),
            Self::Extraction(_) => false,
        }
    }
}

/// Stops a running pipeline at the next document boundary. Clones share
/// the same flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    interrupted: Arc<AtomicBool>,
}

impl InterruptHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }

    /// Clears the flag so the pipeline can run again.
    pub fn reset(&self) {
        self.interrupted.store(false, Ordering::Relaxed);
    }
}

/// Drives documents through extraction, before-store hooks and storage in
/// batches, then runs the after-batch hooks on every settled batch.
pub struct Pipeline {
    config: PipelineConfig,
    hooks: HookRegistry,
    loader: Box<dyn DocumentLoader>,
    session: Box<dyn ReviewSession>,
    interrupt: InterruptHandle,
}

impl Pipeline {
    /// An interactive config gets a console session on stdin/stdout.
    #[must_use]
    pub fn new(config: PipelineConfig, hooks: HookRegistry) -> Self {
        let session: Box<dyn ReviewSession> = if config.interactive {
            Box::new(ConsoleSession::stdio())
        } else {
            Box::new(NonInteractive)
        };

        Self {
            config,
            hooks,
            loader: Box::new(PlainTextLoader::new()),
            session,
            interrupt: InterruptHandle::new(),
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: Box<dyn ReviewSession>) -> Self {
        self.session = session;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// The first `error_report_limit` errors of a run verbatim, then a count
    /// of the rest.
    pub fn error_report(&self, stats: &PipelineStats) -> Vec<String> {
        stats.error_summary(self.config.error_report_limit)
    }

    pub async fn run(
        &self,
        extractor: &dyn EntityExtractor,
        graph: &dyn GraphClient,
    ) -> Result<PipelineStats, PipelineError> {
        let start = Instant::now();
        let mut stats = PipelineStats::new();

        let documents = self.setup(graph).await?;
        stats.documents_total = documents.len();

        let processed = if self.config.skip_processed {
            graph
                .processed_hashes(&self.config.namespace)
                .await
                .map_err(SetupError::from)?
        } else {
            HashSet::new()
        };

        let pending: Vec<ParsedDocument> = documents
            .into_iter()
            .filter(|doc| {
                let seen = processed.contains(&doc.content_hash);
                if seen {
                    tracing::debug!("Skipping already processed {}", doc.doc_id);
                }
                !seen
            })
            .collect();
        stats.documents_skipped = stats.documents_total - pending.len();

        tracing::info!(
            "Starting pipeline run on {}: {} documents, {} already processed, batch size {}{}",
            self.config.namespace,
            stats.documents_total,
            stats.documents_skipped,
            self.config.batch_size,
            if self.config.dry_run { " (dry run)" } else { "" }
        );

        let mut consecutive_failures = 0;

        for (batch_index, batch) in pending.chunks(self.config.batch_size).enumerate() {
            let mut batch_entities = Vec::new();
            let mut extractions = stream::iter(batch)
                .map(|doc| async move { (doc, extractor.extract(doc).await) })
                .buffered(self.config.extract_concurrency);

            loop {
                if self.interrupt.is_interrupted() {
                    tracing::warn!("Pipeline interrupted");
                    return Err(PipelineError::Interrupted {
                        stats: Box::new(self.finish(stats, start)),
                    });
                }

                let Some((doc, extracted)) = extractions.next().await else {
                    break;
                };

                match self.process_document(doc, extracted, graph).await {
                    Ok((entities, outcome)) => {
                        consecutive_failures = 0;
                        stats.documents_processed += 1;
                        stats.entities_created += outcome.entities_created;
                        stats.relationships_created += outcome.relationships_created;
                        batch_entities.extend(entities);
                    }
                    Err(e) if e.is_connection_lost() => {
                        tracing::error!("Lost graph connection on {}: {}", doc.doc_id, e);
                        stats.record_failure(&doc.doc_id, &e);
                        return Err(PipelineError::ConnectionLost {
                            message: e.to_string(),
                            stats: Box::new(self.finish(stats, start)),
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Failed to process {}: {}", doc.doc_id, e);
                        stats.record_failure(&doc.doc_id, &e);
                        consecutive_failures += 1;

                        if consecutive_failures >= self.config.max_failures {
                            tracing::error!(
                                "Aborting after {} consecutive failures",
                                consecutive_failures
                            );
                            return Err(PipelineError::TooManyFailures {
                                consecutive: consecutive_failures,
                                stats: Box::new(self.finish(stats, start)),
                            });
                        }
                    }
                }
            }

            let ctx = BatchContext {
                namespace: self.config.namespace.clone(),
                dry_run: self.config.dry_run,
                batch_index,
            };
            let failures = self
                .hooks
                .run_after_batch(&batch_entities, graph, self.session.as_ref(), &ctx)
                .await;
            let lost = failures
                .iter()
                .find(|(_, e)| e.is_connection_lost())
                .map(|(hook, e)| format!("hook {hook}: {e}"));
            for (hook, e) in failures {
                stats.record_hook_error(&hook, e);
            }
            if let Some(message) = lost {
                tracing::error!("Lost graph connection after batch {}: {}", batch_index, message);
                return Err(PipelineError::ConnectionLost {
                    message,
                    stats: Box::new(self.finish(stats, start)),
                });
            }

            stats.batches_completed += 1;
            tracing::info!(
                "Batch {} complete: {} documents, {} entities",
                batch_index,
                batch.len(),
                batch_entities.len()
            );
        }

        let stats = self.finish(stats, start);
        tracing::info!(
            "Pipeline run finished in {:.2?}: {} processed, {} skipped, {} failed, {} entities, {} relationships ({:.1}% processed)",
            stats.duration,
            stats.documents_processed,
            stats.documents_skipped,
            stats.documents_failed,
            stats.entities_created,
            stats.relationships_created,
            stats.success_rate()
        );

        Ok(stats)
    }

    async fn setup(&self, graph: &dyn GraphClient) -> Result<Vec<ParsedDocument>, SetupError> {
        self.config.validate()?;
        graph.connect().await?;
        Ok(self.loader.load(&self.config.source_dir).await?)
    }

    async fn process_document(
        &self,
        doc: &ParsedDocument,
        extracted: ExtractionResult<Vec<ExtractedEntity>>,
        graph: &dyn GraphClient,
    ) -> Result<(Vec<ExtractedEntity>, StoreOutcome), DocumentError> {
        let found = extracted?;
        let found_count = found.len();

        let entities: Vec<ExtractedEntity> = found
            .into_iter()
            .filter(|e| {
                e.confidence >= self.config.min_confidence
                    && self.config.allows_type(&e.entity_type)
            })
            .collect();

        let entities = self
            .hooks
            .run_before_store(doc, entities, graph, self.session.as_ref())
            .await?;

        let outcome = if self.config.dry_run {
            StoreOutcome::default()
        } else {
            graph
                .store_document(&self.config.namespace, doc, &entities)
                .await?
        };

        tracing::debug!(
            "Processed {}: {} extracted, {} kept, {} new entities",
            doc.doc_id,
            found_count,
            entities.len(),
            outcome.entities_created
        );

        Ok((entities, outcome))
    }

    /// Stamps the duration and logs the bounded error report.
    fn finish(&self, mut stats: PipelineStats, start: Instant) -> PipelineStats {
        stats.duration = start.elapsed();
        if !stats.errors.is_empty() {
            tracing::warn!("{} errors during pipeline run:", stats.errors.len());
            for line in self.error_report(&stats) {
                tracing::warn!("  {}", line);
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SqliteGraph;
    use crate::hooks::{AfterBatchHook, BeforeStoreHook, HookResult};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct FixedLoader(Vec<ParsedDocument>);

    #[async_trait]
    impl DocumentLoader for FixedLoader {
        async fn load(&self, _root: &Path) -> Result<Vec<ParsedDocument>, LoadError> {
            Ok(self.0.clone())
        }
    }

    /// One `Person` named after the document, or an error for listed ids.
    struct ScriptedExtractor {
        failing: Vec<&'static str>,
        on_extract: Option<Box<dyn Fn(&str) + Send + Sync>>,
    }

    impl ScriptedExtractor {
        fn new() -> Self {
            Self {
                failing: Vec::new(),
                on_extract: None,
            }
        }

        fn failing(ids: &[&'static str]) -> Self {
            Self {
                failing: ids.to_vec(),
                on_extract: None,
            }
        }
    }

    #[async_trait]
    impl EntityExtractor for ScriptedExtractor {
        async fn extract(&self, document: &ParsedDocument) -> ExtractionResult<Vec<ExtractedEntity>> {
            if let Some(callback) = &self.on_extract {
                callback(&document.doc_id);
            }
            if self.failing.contains(&document.doc_id.as_str()) {
                return Err(ExtractionError::Failed("model crashed".into()));
            }
            Ok(vec![
                ExtractedEntity::new("Person", format!("Person {}", document.doc_id), 0.9),
                ExtractedEntity::new("Organization", "Acme", 0.4),
            ])
        }
    }

    struct BatchRecorder(Arc<Mutex<Vec<(usize, usize)>>>);

    #[async_trait]
    impl AfterBatchHook for BatchRecorder {
        fn name(&self) -> &str {
            "batch-recorder"
        }

        async fn after_batch(
            &self,
            entities: &[ExtractedEntity],
            _graph: &dyn GraphClient,
            _session: &dyn ReviewSession,
            ctx: &BatchContext,
        ) -> HookResult<()> {
            self.0.lock().unwrap().push((ctx.batch_index, entities.len()));
            if ctx.batch_index == 1 {
                return Err(HookError::failed("batch-recorder", "flaky"));
            }
            Ok(())
        }
    }

    struct RejectDoc(&'static str);

    #[async_trait]
    impl BeforeStoreHook for RejectDoc {
        fn name(&self) -> &str {
            "reject"
        }

        async fn before_store(
            &self,
            document: &ParsedDocument,
            entities: Vec<ExtractedEntity>,
            _graph: &dyn GraphClient,
            _session: &dyn ReviewSession,
        ) -> HookResult<Vec<ExtractedEntity>> {
            if document.doc_id == self.0 {
                return Err(HookError::failed("reject", "bad document"));
            }
            Ok(entities)
        }
    }

    fn docs(n: usize) -> Vec<ParsedDocument> {
        (1..=n)
            .map(|i| ParsedDocument::new(format!("doc{i}"), format!("Document number {i}")))
            .collect()
    }

    fn pipeline(config: PipelineConfig, hooks: HookRegistry, n: usize) -> Pipeline {
        Pipeline::new(config, hooks).with_loader(Box::new(FixedLoader(docs(n))))
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new("test", "unused")
    }

    #[tokio::test]
    async fn test_run_stores_everything() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let stats = pipeline(config(), HookRegistry::new(), 3)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap();

        assert_eq!(stats.documents_total, 3);
        assert_eq!(stats.documents_processed, 3);
        assert_eq!(stats.entities_created, 4);
        assert_eq!(stats.relationships_created, 6);
        assert_eq!(stats.batches_completed, 1);
        assert!((stats.success_rate() - 100.0).abs() < 1e-9);
        assert_eq!(graph.entity_count("test").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_rerun_skips_processed_documents() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let pipeline = pipeline(config(), HookRegistry::new(), 3);

        pipeline.run(&ScriptedExtractor::new(), &graph).await.unwrap();
        let second = pipeline.run(&ScriptedExtractor::new(), &graph).await.unwrap();

        assert_eq!(second.documents_processed, 0);
        assert_eq!(second.documents_skipped, 3);
        assert_eq!(second.batches_completed, 0);

        let forced = Pipeline::new(config().with_skip_processed(false), HookRegistry::new())
            .with_loader(Box::new(FixedLoader(docs(3))))
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap();
        assert_eq!(forced.documents_processed, 3);
        assert_eq!(forced.entities_created, 0);
    }

    #[tokio::test]
    async fn test_consecutive_failures_abort() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let err = pipeline(config().with_max_failures(3), HookRegistry::new(), 8)
            .run(&ScriptedExtractor::failing(&["doc4", "doc5", "doc6"]), &graph)
            .await
            .unwrap_err();

        let PipelineError::TooManyFailures { consecutive, stats } = err else {
            panic!("expected TooManyFailures");
        };
        assert_eq!(consecutive, 3);
        assert_eq!(stats.documents_processed, 3);
        assert_eq!(stats.documents_failed, 3);
        assert_eq!(stats.errors[0], "doc4: Extraction error: Extraction failed: model crashed");
        assert_eq!(stats.batches_completed, 0);
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let hooks = HookRegistry::new().with_before_store(Box::new(RejectDoc("doc6")));

        let stats = pipeline(config().with_max_failures(2), hooks, 6)
            .run(&ScriptedExtractor::failing(&["doc2", "doc4"]), &graph)
            .await
            .unwrap();

        assert_eq!(stats.documents_processed, 3);
        assert_eq!(stats.documents_failed, 3);
        assert_eq!(stats.errors[2], "doc6: Hook reject failed: bad document");
    }

    #[tokio::test]
    async fn test_filters_apply_before_hooks() {
        let graph = SqliteGraph::open_memory().await.unwrap();

        let stats = pipeline(config().with_min_confidence(0.5), HookRegistry::new(), 2)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap();
        assert_eq!(stats.entities_created, 2);

        let graph = SqliteGraph::open_memory().await.unwrap();
        let stats = pipeline(config().with_entity_types(["organization"]), HookRegistry::new(), 2)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap();
        assert_eq!(stats.entities_created, 1);
        assert_eq!(graph.list_entities("test", 10).await.unwrap()[0].name, "Acme");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let stats = pipeline(config().with_dry_run(true), HookRegistry::new(), 2)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap();

        assert_eq!(stats.documents_processed, 2);
        assert_eq!(stats.entities_created, 0);
        assert_eq!(graph.entity_count("test").await.unwrap(), 0);
        assert!(graph.processed_hashes("test").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_after_batch_runs_per_batch() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hooks = HookRegistry::new().with_after_batch(Box::new(BatchRecorder(Arc::clone(&seen))));

        let stats = pipeline(
            config().with_batch_size(2).with_extract_concurrency(2),
            hooks,
            5,
        )
        .run(&ScriptedExtractor::new(), &graph)
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(0, 4), (1, 4), (2, 2)]);
        assert_eq!(stats.batches_completed, 3);
        assert_eq!(stats.hook_errors, 1);
        assert_eq!(stats.documents_failed, 0);
        assert_eq!(stats.errors, vec!["hook batch-recorder: Hook batch-recorder failed: flaky"]);
    }

    #[tokio::test]
    async fn test_interrupt_stops_at_document_boundary() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let pipeline = pipeline(config(), HookRegistry::new(), 5);
        let handle = pipeline.interrupt_handle();

        let extractor = ScriptedExtractor {
            failing: Vec::new(),
            on_extract: Some(Box::new(move |doc_id| {
                if doc_id == "doc2" {
                    handle.interrupt();
                }
            })),
        };

        let err = pipeline.run(&extractor, &graph).await.unwrap_err();
        assert!(matches!(err, PipelineError::Interrupted { .. }));
        assert_eq!(err.stats().unwrap().documents_processed, 2);

        // Still set: the next run stops before its first document.
        let err = pipeline.run(&extractor, &graph).await.unwrap_err();
        assert_eq!(err.stats().unwrap().documents_processed, 0);
        assert_eq!(err.stats().unwrap().documents_skipped, 2);

        // Cleared: the run resumes after the documents already stored.
        pipeline.interrupt_handle().reset();
        let stats = pipeline.run(&extractor, &graph).await.unwrap();
        assert_eq!(stats.documents_processed, 3);
        assert_eq!(stats.documents_skipped, 2);
    }

    struct CloseGraphOn(&'static str);

    #[async_trait]
    impl BeforeStoreHook for CloseGraphOn {
        fn name(&self) -> &str {
            "close-graph"
        }

        async fn before_store(
            &self,
            document: &ParsedDocument,
            entities: Vec<ExtractedEntity>,
            graph: &dyn GraphClient,
            _session: &dyn ReviewSession,
        ) -> HookResult<Vec<ExtractedEntity>> {
            if document.doc_id == self.0 {
                graph.close().await?;
            }
            Ok(entities)
        }
    }

    #[tokio::test]
    async fn test_lost_connection_aborts() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let hooks = HookRegistry::new().with_before_store(Box::new(CloseGraphOn("doc2")));

        let err = pipeline(config().with_max_failures(10), hooks, 4)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap_err();

        let PipelineError::ConnectionLost { stats, .. } = err else {
            panic!("expected ConnectionLost");
        };
        assert_eq!(stats.documents_processed, 1);
        assert_eq!(stats.documents_failed, 1);
    }

    /// Closes the graph on one document, then reads from it.
    struct ReadAfterClose(&'static str);

    #[async_trait]
    impl BeforeStoreHook for ReadAfterClose {
        fn name(&self) -> &str {
            "read-after-close"
        }

        async fn before_store(
            &self,
            document: &ParsedDocument,
            entities: Vec<ExtractedEntity>,
            graph: &dyn GraphClient,
            _session: &dyn ReviewSession,
        ) -> HookResult<Vec<ExtractedEntity>> {
            if document.doc_id == self.0 {
                graph.close().await?;
                graph.list_entities("test", 10).await?;
            }
            Ok(entities)
        }
    }

    #[tokio::test]
    async fn test_lost_connection_inside_hook_aborts() {
        for dry_run in [false, true] {
            let graph = SqliteGraph::open_memory().await.unwrap();
            let hooks = HookRegistry::new().with_before_store(Box::new(ReadAfterClose("doc2")));

            let err = pipeline(config().with_max_failures(10).with_dry_run(dry_run), hooks, 5)
                .run(&ScriptedExtractor::new(), &graph)
                .await
                .unwrap_err();

            let PipelineError::ConnectionLost { stats, .. } = err else {
                panic!("expected ConnectionLost (dry_run = {dry_run})");
            };
            assert_eq!(stats.documents_processed, 1);
            assert_eq!(stats.documents_failed, 1);
            assert!(stats.errors[0].starts_with("doc2: Graph error"));
        }
    }

    struct CloseAfterBatch;

    #[async_trait]
    impl AfterBatchHook for CloseAfterBatch {
        fn name(&self) -> &str {
            "close-after-batch"
        }

        async fn after_batch(
            &self,
            _entities: &[ExtractedEntity],
            graph: &dyn GraphClient,
            _session: &dyn ReviewSession,
            ctx: &BatchContext,
        ) -> HookResult<()> {
            graph.close().await?;
            graph.list_entities(&ctx.namespace, 10).await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_lost_connection_after_batch_aborts() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let hooks = HookRegistry::new().with_after_batch(Box::new(CloseAfterBatch));

        let err = pipeline(config().with_batch_size(2), hooks, 4)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap_err();

        let PipelineError::ConnectionLost { message, stats } = err else {
            panic!("expected ConnectionLost");
        };
        assert!(message.starts_with("hook close-after-batch:"));
        assert_eq!(stats.documents_processed, 2);
        assert_eq!(stats.batches_completed, 0);
        assert_eq!(stats.hook_errors, 1);
        assert_eq!(stats.documents_failed, 0);
    }

    #[tokio::test]
    async fn test_error_report_respects_limit() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let pipeline = pipeline(
            config().with_max_failures(10).with_error_report_limit(1),
            HookRegistry::new(),
            4,
        );

        let stats = pipeline
            .run(&ScriptedExtractor::failing(&["doc1", "doc2", "doc3"]), &graph)
            .await
            .unwrap();

        assert_eq!(stats.errors.len(), 3);
        assert_eq!(
            pipeline.error_report(&stats),
            vec![
                "doc1: Extraction error: Extraction failed: model crashed".to_string(),
                "... and 2 more".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_graph_is_a_setup_error() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        graph.close().await.unwrap();

        let err = pipeline(config(), HookRegistry::new(), 2)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Setup(SetupError::Graph(_))));
        assert!(err.stats().is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_is_a_setup_error() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let err = pipeline(config().with_batch_size(0), HookRegistry::new(), 1)
            .run(&ScriptedExtractor::new(), &graph)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Setup(SetupError::Config(ConfigError::NotPositive { .. }))
        ));
    }
}
