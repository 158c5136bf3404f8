use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use std::collections::HashSet;

use super::{GraphClient, MergeOutcome, Statement, StoreOutcome};
use crate::document::ParsedDocument;
use crate::entity::{normalize_name, ExtractedEntity, GraphEntity};
use crate::relationship::{mention_properties, Mention};
use crate::{Error, Result};

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    namespace TEXT NOT NULL,
    doc_id TEXT NOT NULL,
    title TEXT NOT NULL,
    source_file TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    processed_at TEXT NOT NULL,
    PRIMARY KEY (namespace, doc_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_hash ON documents(namespace, content_hash);

CREATE TABLE IF NOT EXISTS entities (
    namespace TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (namespace, entity_type, normalized_name)
);

CREATE TABLE IF NOT EXISTS mentions (
    namespace TEXT NOT NULL,
    doc_id TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    properties TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (namespace, doc_id, entity_type, normalized_name)
);

CREATE INDEX IF NOT EXISTS idx_mentions_entity ON mentions(namespace, entity_type, normalized_name);
"#;

const UPSERT_DOCUMENT: &str = r#"
INSERT INTO documents (namespace, doc_id, title, source_file, content_hash, processed_at)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(namespace, doc_id) DO UPDATE SET
    title = excluded.title,
    source_file = excluded.source_file,
    content_hash = excluded.content_hash,
    processed_at = excluded.processed_at
"#;

const CLEAR_DOCUMENT_MENTIONS: &str = "DELETE FROM mentions WHERE namespace = ? AND doc_id = ?";

const INSERT_ENTITY: &str = r#"
INSERT OR IGNORE INTO entities (namespace, entity_type, name, normalized_name, created_at)
VALUES (?, ?, ?, ?, ?)
"#;

const INSERT_MENTION: &str = r#"
INSERT INTO mentions (namespace, doc_id, entity_type, normalized_name, properties, created_at)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(namespace, doc_id, entity_type, normalized_name) DO NOTHING
"#;

// OR IGNORE leaves behind rows whose document already mentions the kept
// entity; the following DELETE drops those stale edges.
const REPOINT_MENTIONS: &str = r#"
UPDATE OR IGNORE mentions
SET entity_type = ?, normalized_name = ?
WHERE namespace = ? AND entity_type = ? AND normalized_name = ?
"#;

const DELETE_ENTITY_MENTIONS: &str =
    "DELETE FROM mentions WHERE namespace = ? AND entity_type = ? AND normalized_name = ?";

const DELETE_ENTITY: &str =
    "DELETE FROM entities WHERE namespace = ? AND entity_type = ? AND normalized_name = ?";

pub struct SqliteGraph {
    pool: Pool<Sqlite>,
}

impl SqliteGraph {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        // A second connection would see a different in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn entity_count(&self, namespace: &str) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities WHERE namespace = ?")
            .bind(namespace)
            .fetch_one(&self.pool)
            .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn entity_exists(
        tx: &mut Transaction<'_, Sqlite>,
        namespace: &str,
        entity: &GraphEntity,
    ) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM entities WHERE namespace = ? AND entity_type = ? AND normalized_name = ?",
        )
        .bind(namespace)
        .bind(&entity.entity_type)
        .bind(&entity.normalized_name)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.is_some())
    }
}

fn merge_statements(namespace: &str, to_remove: &GraphEntity, to_keep: &GraphEntity) -> Vec<Statement> {
    vec![
        Statement::new(REPOINT_MENTIONS)
            .bind(to_keep.entity_type.as_str())
            .bind(to_keep.normalized_name.as_str())
            .bind(namespace)
            .bind(to_remove.entity_type.as_str())
            .bind(to_remove.normalized_name.as_str()),
        Statement::new(DELETE_ENTITY_MENTIONS)
            .bind(namespace)
            .bind(to_remove.entity_type.as_str())
            .bind(to_remove.normalized_name.as_str()),
        Statement::new(DELETE_ENTITY)
            .bind(namespace)
            .bind(to_remove.entity_type.as_str())
            .bind(to_remove.normalized_name.as_str()),
    ]
}

fn bind_param<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q serde_json::Value,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    use serde_json::Value;

    Ok(match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                return Err(Error::InvalidParameter(n.to_string()));
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(param.to_string()),
    })
}

async fn run_statements(
    tx: &mut Transaction<'_, Sqlite>,
    statements: &[Statement],
) -> Result<Vec<u64>> {
    let mut affected = Vec::with_capacity(statements.len());

    for stmt in statements {
        let mut query = sqlx::query(&stmt.query);
        for param in &stmt.params {
            query = bind_param(query, param)?;
        }
        let result = query.execute(&mut **tx).await?;
        affected.push(result.rows_affected());
    }

    Ok(affected)
}

fn to_count(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[async_trait]
impl GraphClient for SqliteGraph {
    async fn connect(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::ConnectionLost(e.to_string()))?;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn execute_write_tx(&self, statements: &[Statement]) -> Result<Vec<u64>> {
        let mut tx = self.pool.begin().await?;
        let affected = run_statements(&mut tx, statements).await?;
        tx.commit().await?;

        Ok(affected)
    }

    async fn list_entities(&self, namespace: &str, limit: usize) -> Result<Vec<GraphEntity>> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT namespace, entity_type, name, normalized_name, created_at
            FROM entities WHERE namespace = ? ORDER BY rowid LIMIT ?
            "#,
        )
        .bind(namespace)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_entity_row).collect()
    }

    async fn delete_entity(&self, namespace: &str, entity_type: &str, name: &str) -> Result<()> {
        let normalized = normalize_name(name);
        let statements = [
            Statement::new(DELETE_ENTITY_MENTIONS)
                .bind(namespace)
                .bind(entity_type)
                .bind(normalized.as_str()),
            Statement::new(DELETE_ENTITY)
                .bind(namespace)
                .bind(entity_type)
                .bind(normalized.as_str()),
        ];

        let mut tx = self.pool.begin().await?;
        let affected = run_statements(&mut tx, &statements).await?;

        if affected.get(1).copied().unwrap_or(0) == 0 {
            return Err(Error::EntityNotFound {
                namespace: namespace.to_string(),
                entity_type: entity_type.to_string(),
                name: name.to_string(),
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn store_document(
        &self,
        namespace: &str,
        document: &ParsedDocument,
        entities: &[ExtractedEntity],
    ) -> Result<StoreOutcome> {
        let now = Utc::now().to_rfc3339();

        let mut statements = vec![
            Statement::new(UPSERT_DOCUMENT)
                .bind(namespace)
                .bind(document.doc_id.as_str())
                .bind(document.title.as_str())
                .bind(document.source_file.to_string_lossy().into_owned())
                .bind(document.content_hash.as_str())
                .bind(now.as_str()),
            Statement::new(CLEAR_DOCUMENT_MENTIONS)
                .bind(namespace)
                .bind(document.doc_id.as_str()),
        ];

        for entity in entities {
            let normalized = entity.normalized_name();
            if normalized.is_empty() {
                continue;
            }

            statements.push(
                Statement::new(INSERT_ENTITY)
                    .bind(namespace)
                    .bind(entity.entity_type.as_str())
                    .bind(entity.name.trim())
                    .bind(normalized.as_str())
                    .bind(now.as_str()),
            );
            statements.push(
                Statement::new(INSERT_MENTION)
                    .bind(namespace)
                    .bind(document.doc_id.as_str())
                    .bind(entity.entity_type.as_str())
                    .bind(normalized)
                    .bind(mention_properties(entity.confidence, &entity.attributes))
                    .bind(now.as_str()),
            );
        }

        let affected = self.execute_write_tx(&statements).await?;

        let outcome = affected
            .get(2..)
            .unwrap_or_default()
            .chunks(2)
            .fold(StoreOutcome::default(), |mut acc, pair| {
                acc.entities_created += to_count(pair[0]);
                if let Some(&mentions) = pair.get(1) {
                    acc.relationships_created += to_count(mentions);
                }
                acc
            });

        Ok(outcome)
    }

    async fn merge_entities(
        &self,
        namespace: &str,
        to_remove: &GraphEntity,
        to_keep: &GraphEntity,
    ) -> Result<MergeOutcome> {
        if to_remove.key() == to_keep.key() {
            return Err(Error::SelfMerge(to_remove.name.clone()));
        }

        let mut tx = self.pool.begin().await?;

        if !Self::entity_exists(&mut tx, namespace, to_keep).await? {
            return Err(Error::EntityNotFound {
                namespace: namespace.to_string(),
                entity_type: to_keep.entity_type.clone(),
                name: to_keep.name.clone(),
            });
        }

        let affected = run_statements(&mut tx, &merge_statements(namespace, to_remove, to_keep)).await?;

        // Dropping `tx` without commit rolls back the re-pointed edges.
        if affected.get(2).copied().unwrap_or(0) == 0 {
            return Err(Error::EntityNotFound {
                namespace: namespace.to_string(),
                entity_type: to_remove.entity_type.clone(),
                name: to_remove.name.clone(),
            });
        }

        tx.commit().await?;

        Ok(MergeOutcome {
            mentions_moved: affected[0],
            mentions_dropped: affected[1],
        })
    }

    async fn processed_hashes(&self, namespace: &str) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT content_hash FROM documents WHERE namespace = ?")
                .bind(namespace)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(hash,)| hash).collect())
    }

    async fn mentions_of(&self, namespace: &str, entity: &GraphEntity) -> Result<Vec<Mention>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT doc_id, properties FROM mentions
            WHERE namespace = ? AND entity_type = ? AND normalized_name = ?
            ORDER BY doc_id
            "#,
        )
        .bind(namespace)
        .bind(&entity.entity_type)
        .bind(&entity.normalized_name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(doc_id, properties)| -> Result<Mention> {
                Ok(Mention {
                    namespace: namespace.to_string(),
                    doc_id,
                    entity_type: entity.entity_type.clone(),
                    normalized_name: entity.normalized_name.clone(),
                    properties: serde_json::from_str(&properties)?,
                })
            })
            .collect()
    }
}

fn parse_entity_row(row: (String, String, String, String, String)) -> Result<GraphEntity> {
    let (namespace, entity_type, name, normalized_name, created_at) = row;

    Ok(GraphEntity {
        namespace,
        entity_type,
        name,
        normalized_name,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Database(sqlx::Error::Decode(Box::new(e))))?
            .with_timezone(&Utc),
    })
}
