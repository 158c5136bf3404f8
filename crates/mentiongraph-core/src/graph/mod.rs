mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::document::ParsedDocument;
use crate::entity::{ExtractedEntity, GraphEntity};
use crate::relationship::Mention;
use crate::Result;

pub use sqlite::SqliteGraph;

/// A query template plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}

impl Statement {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn bind(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    pub entities_created: usize,
    pub relationships_created: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Mentions re-pointed at the kept entity.
    pub mentions_moved: u64,
    /// Mentions dropped because the same document already mentioned the kept entity.
    pub mentions_dropped: u64,
}

/// Queries cross as parameterized [`Statement`]s in whatever language the
/// binding speaks (SQL for [`SqliteGraph`]).
#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Runs every statement in one write transaction and returns the rows
    /// affected by each. Nothing is committed if any statement fails.
    async fn execute_write_tx(&self, statements: &[Statement]) -> Result<Vec<u64>>;

    async fn list_entities(&self, namespace: &str, limit: usize) -> Result<Vec<GraphEntity>>;

    /// Removes an entity and its mentions. `name` is matched by normalized form.
    async fn delete_entity(&self, namespace: &str, entity_type: &str, name: &str) -> Result<()>;

    /// Persists the document node, its entities and one mention per entity
    /// in a single transaction. Mentions from a previous version of the
    /// document are replaced.
    async fn store_document(
        &self,
        namespace: &str,
        document: &ParsedDocument,
        entities: &[ExtractedEntity],
    ) -> Result<StoreOutcome>;

    /// Re-points every mention of `to_remove` at `to_keep` and deletes
    /// `to_remove`, atomically.
    async fn merge_entities(
        &self,
        namespace: &str,
        to_remove: &GraphEntity,
        to_keep: &GraphEntity,
    ) -> Result<MergeOutcome>;

    /// Content hashes of every document already stored in `namespace`.
    async fn processed_hashes(&self, namespace: &str) -> Result<HashSet<String>>;

    async fn mentions_of(&self, namespace: &str, entity: &GraphEntity) -> Result<Vec<Mention>>;
}
