use async_trait::async_trait;

use super::{AfterBatchHook, BatchContext, HookResult};
use crate::dedup::DedupEngine;
use crate::entity::ExtractedEntity;
use crate::graph::GraphClient;
use crate::review::ReviewSession;

/// Runs a deduplication pass over the whole namespace after every batch.
#[derive(Debug, Clone, Default)]
pub struct GraphDedupHook {
    engine: DedupEngine,
}

impl GraphDedupHook {
    #[must_use]
    pub fn new(engine: DedupEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &DedupEngine {
        &self.engine
    }
}

#[async_trait]
impl AfterBatchHook for GraphDedupHook {
    fn name(&self) -> &str {
        "graph-dedup"
    }

    async fn after_batch(
        &self,
        _entities: &[ExtractedEntity],
        graph: &dyn GraphClient,
        session: &dyn ReviewSession,
        ctx: &BatchContext,
    ) -> HookResult<()> {
        if ctx.dry_run {
            let pairs = self
                .engine
                .find_similar_entities(graph, &ctx.namespace, self.engine.threshold())
                .await?;

            for pair in &pairs {
                tracing::debug!(
                    "Would merge '{}' and '{}' ({}, {:.2})",
                    pair.first.name,
                    pair.second.name,
                    pair.first.entity_type,
                    pair.score
                );
            }
            tracing::info!(
                "Dry run: {} duplicate candidates in {} after batch {}, nothing merged",
                pairs.len(),
                ctx.namespace,
                ctx.batch_index
            );
            return Ok(());
        }

        let report = self.engine.deduplicate(graph, &ctx.namespace, session).await?;
        tracing::debug!("Dedup after batch {} merged {} entities", ctx.batch_index, report.merged);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ParsedDocument;
    use crate::graph::SqliteGraph;
    use crate::review::NonInteractive;

    async fn graph_with_duplicates() -> SqliteGraph {
        let graph = SqliteGraph::open_memory().await.unwrap();
        graph
            .store_document(
                "ns",
                &ParsedDocument::new("a.txt", "Catherine Jones"),
                &[ExtractedEntity::new("Person", "Catherine Jones", 0.9)],
            )
            .await
            .unwrap();
        graph
            .store_document(
                "ns",
                &ParsedDocument::new("b.txt", "Katherine Jones"),
                &[ExtractedEntity::new("Person", "Katherine Jones", 0.9)],
            )
            .await
            .unwrap();
        graph
    }

    fn ctx(dry_run: bool) -> BatchContext {
        BatchContext {
            namespace: "ns".into(),
            dry_run,
            batch_index: 0,
        }
    }

    #[tokio::test]
    async fn test_dry_run_leaves_graph_untouched() {
        let graph = graph_with_duplicates().await;

        GraphDedupHook::default()
            .after_batch(&[], &graph, &NonInteractive, &ctx(true))
            .await
            .unwrap();

        assert_eq!(graph.entity_count("ns").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_merges_duplicates() {
        let graph = graph_with_duplicates().await;

        GraphDedupHook::new(DedupEngine::new())
            .after_batch(&[], &graph, &NonInteractive, &ctx(false))
            .await
            .unwrap();

        let remaining = graph.list_entities("ns", 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        // Same length: the second of the pair survives.
        assert_eq!(remaining[0].name, "Katherine Jones");
    }
}
