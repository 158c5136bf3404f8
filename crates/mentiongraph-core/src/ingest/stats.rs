use serde::Serialize;
use std::time::Duration;

/// Counters for one pipeline run, returned on success and carried by
/// every abort.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Documents found under the source directory, skipped ones included
    pub documents_total: usize,
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub documents_failed: usize,
    pub entities_created: usize,
    pub relationships_created: usize,
    pub batches_completed: usize,
    pub hook_errors: usize,
    pub duration: Duration,
    /// Failure messages in the order they happened
    pub errors: Vec<String>,
}

impl PipelineStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage of found documents that were processed; `0.0` when none were found.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.documents_total == 0 {
            return 0.0;
        }
        self.documents_processed as f64 / self.documents_total as f64 * 100.0
    }

    pub(crate) fn record_failure(&mut self, doc_id: &str, message: impl std::fmt::Display) {
        self.documents_failed += 1;
        self.errors.push(format!("{doc_id}: {message}"));
    }

    pub(crate) fn record_hook_error(&mut self, hook: &str, message: impl std::fmt::Display) {
        self.hook_errors += 1;
        self.errors.push(format!("hook {hook}: {message}"));
    }

    /// The first `limit` errors verbatim, then a count of the rest.
    #[must_use]
    pub fn error_summary(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self.errors.iter().take(limit).cloned().collect();
        let rest = self.errors.len().saturating_sub(limit);
        if rest > 0 {
            lines.push(format!("... and {rest} more"));
        }
        lines
    }
}
