mod similarity;

use std::collections::HashSet;
use thiserror::Error;

use crate::entity::GraphEntity;
use crate::graph::{GraphClient, MergeOutcome};
use crate::review::ReviewSession;

pub use similarity::{sequence_ratio, SimilarityMetric};

pub const DEFAULT_THRESHOLD: f64 = 0.75;
pub const DEFAULT_MAX_ENTITIES: usize = 1000;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("Cannot merge {remove} into {keep}: entity types differ")]
    TypeMismatch { remove: String, keep: String },
    #[error("Graph error: {0}")]
    Graph(#[from] crate::Error),
}

pub type DedupResult<T> = Result<T, DedupError>;

#[derive(Debug, Clone)]
pub struct SimilarPair {
    pub first: GraphEntity,
    pub second: GraphEntity,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub candidates: usize,
    pub merged: usize,
    pub skipped: usize,
    /// Pairs not attempted because one side had already been merged away.
    pub stale: usize,
    pub failed: usize,
}

/// Picks the canonical entity of a pair for unattended merges: the longer
/// name wins, a tie keeps `second`. Returns `(keep, remove)`.
#[must_use]
pub fn auto_canonical<'a>(
    first: &'a GraphEntity,
    second: &'a GraphEntity,
) -> (&'a GraphEntity, &'a GraphEntity) {
    if first.name_len() > second.name_len() {
        (first, second)
    } else {
        (second, first)
    }
}

fn identity(entity: &GraphEntity) -> (String, String) {
    (entity.entity_type.clone(), entity.normalized_name.clone())
}

#[derive(Debug, Clone)]
pub struct DedupEngine {
    threshold: f64,
    max_entities: usize,
    metric: SimilarityMetric,
}

impl Default for DedupEngine {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_entities: DEFAULT_MAX_ENTITIES,
            metric: SimilarityMetric::default(),
        }
    }
}

impl DedupEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> DedupResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DedupError::InvalidThreshold(threshold));
        }
        self.threshold = threshold;
        Ok(self)
    }

    #[must_use]
    pub fn with_max_entities(mut self, max_entities: usize) -> Self {
        self.max_entities = max_entities;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Pairs of same-typed entities scoring at least `threshold`, best first.
    /// Equal scores keep the order in which the pairs were found.
    #[must_use]
    pub fn similar_pairs(&self, entities: &[GraphEntity], threshold: f64) -> Vec<SimilarPair> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::new();

        for (i, first) in entities.iter().enumerate() {
            for second in &entities[i + 1..] {
                if first.entity_type != second.entity_type || first.key() == second.key() {
                    continue;
                }

                let score = self.metric.score(&first.name, &second.name);
                if score < threshold {
                    continue;
                }

                let (lo, hi) = if first.normalized_name <= second.normalized_name {
                    (&first.normalized_name, &second.normalized_name)
                } else {
                    (&second.normalized_name, &first.normalized_name)
                };
                if !seen.insert((first.entity_type.clone(), lo.clone(), hi.clone())) {
                    continue;
                }

                pairs.push(SimilarPair {
                    first: first.clone(),
                    second: second.clone(),
                    score,
                });
            }
        }

        pairs.sort_by(|a, b| b.score.total_cmp(&a.score));
        pairs
    }

    pub async fn find_similar_entities(
        &self,
        graph: &dyn GraphClient,
        namespace: &str,
        threshold: f64,
    ) -> DedupResult<Vec<SimilarPair>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DedupError::InvalidThreshold(threshold));
        }

        let entities = graph.list_entities(namespace, self.max_entities).await?;
        let pairs = self.similar_pairs(&entities, threshold);

        tracing::debug!(
            "Scanned {} entities in {}: {} pairs at threshold {:.2}",
            entities.len(),
            namespace,
            pairs.len(),
            threshold
        );

        Ok(pairs)
    }

    /// Folds `to_remove` into `to_keep`. Either the whole merge is visible
    /// afterwards or none of it is; failures are not retried.
    pub async fn merge_entities(
        &self,
        graph: &dyn GraphClient,
        namespace: &str,
        to_remove: &GraphEntity,
        to_keep: &GraphEntity,
    ) -> DedupResult<MergeOutcome> {
        if to_remove.entity_type != to_keep.entity_type {
            return Err(DedupError::TypeMismatch {
                remove: to_remove.to_string(),
                keep: to_keep.to_string(),
            });
        }

        let outcome = graph.merge_entities(namespace, to_remove, to_keep).await?;

        tracing::info!(
            "Merged '{}' into '{}' in {} ({} mentions moved, {} dropped)",
            to_remove.name,
            to_keep.name,
            namespace,
            outcome.mentions_moved,
            outcome.mentions_dropped
        );

        Ok(outcome)
    }

    /// Applies the merge policy to discovered pairs.
    ///
    /// An enabled session confirms every pair and picks the surviving name
    /// (the longer one is suggested). Otherwise every pair is merged with
    /// [`auto_canonical`]. A failed merge is counted and the pass moves on.
    pub async fn resolve(
        &self,
        graph: &dyn GraphClient,
        namespace: &str,
        pairs: &[SimilarPair],
        session: &dyn ReviewSession,
    ) -> DedupReport {
        let mut report = DedupReport {
            candidates: pairs.len(),
            ..DedupReport::default()
        };
        let mut removed: HashSet<(String, String)> = HashSet::new();

        for pair in pairs {
            if removed.contains(&identity(&pair.first)) || removed.contains(&identity(&pair.second)) {
                report.stale += 1;
                continue;
            }

            let (keep, remove) = if session.enabled() {
                match Self::ask_reviewer(pair, session) {
                    Some(choice) => choice,
                    None => {
                        report.skipped += 1;
                        continue;
                    }
                }
            } else {
                auto_canonical(&pair.first, &pair.second)
            };

            match self.merge_entities(graph, namespace, remove, keep).await {
                Ok(_) => {
                    report.merged += 1;
                    removed.insert(identity(remove));
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Failed to merge '{}' into '{}': {}", remove.name, keep.name, e);
                }
            }
        }

        tracing::info!(
            "Deduplicated {}: {} candidates, {} merged, {} skipped, {} stale, {} failed",
            namespace,
            report.candidates,
            report.merged,
            report.skipped,
            report.stale,
            report.failed
        );

        report
    }

    /// Discovery followed by [`Self::resolve`] at the engine's threshold.
    pub async fn deduplicate(
        &self,
        graph: &dyn GraphClient,
        namespace: &str,
        session: &dyn ReviewSession,
    ) -> DedupResult<DedupReport> {
        let pairs = self.find_similar_entities(graph, namespace, self.threshold).await?;
        Ok(self.resolve(graph, namespace, &pairs, session).await)
    }

    fn ask_reviewer<'a>(
        pair: &'a SimilarPair,
        session: &dyn ReviewSession,
    ) -> Option<(&'a GraphEntity, &'a GraphEntity)> {
        let question = format!(
            "Merge \"{}\" and \"{}\" ({}, similarity {:.2})?",
            pair.first.name, pair.second.name, pair.first.entity_type, pair.score
        );
        if !session.confirm(&question, false) {
            return None;
        }

        let (suggested, _) = auto_canonical(&pair.first, &pair.second);
        let default = usize::from(suggested.same_identity(&pair.second));
        let choices = [pair.first.name.clone(), pair.second.name.clone()];

        if session.choose("Which name should be kept?", &choices, default) == 0 {
            Some((&pair.first, &pair.second))
        } else {
            Some((&pair.second, &pair.first))
        }
    }
}
