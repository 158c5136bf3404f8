use async_trait::async_trait;

use super::{BeforeStoreHook, HookResult};
use crate::document::ParsedDocument;
use crate::entity::ExtractedEntity;
use crate::graph::GraphClient;
use crate::review::ReviewSession;

const COMMAND_HELP: &str = "Command (delete N, edit N, merge N M, done)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Delete(usize),
    Edit(usize),
    Merge(usize, usize),
    Done,
}

fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim().to_lowercase();
    let parts: Vec<&str> = input.split_whitespace().collect();

    let number = |s: &str| {
        s.parse::<usize>()
            .map_err(|_| format!("'{s}' is not an entity number"))
    };

    match parts.as_slice() {
        [] | ["done"] => Ok(Command::Done),
        ["delete", n] => Ok(Command::Delete(number(n)?)),
        ["edit", n] => Ok(Command::Edit(number(n)?)),
        ["merge", n, m] => Ok(Command::Merge(number(n)?, number(m)?)),
        _ => Err(format!("Unknown command: '{input}'")),
    }
}

/// Per-document review state: which entities survive, and what was done.
struct Review {
    entities: Vec<ExtractedEntity>,
    removed: Vec<bool>,
    deleted: usize,
    edited: usize,
    merged: usize,
}

impl Review {
    fn new(entities: Vec<ExtractedEntity>) -> Self {
        let removed = vec![false; entities.len()];
        Self {
            entities,
            removed,
            deleted: 0,
            edited: 0,
            merged: 0,
        }
    }

    /// Maps a 1-based entity number to a live index.
    fn index(&self, n: usize) -> Result<usize, String> {
        if n == 0 || n > self.entities.len() {
            return Err(format!(
                "{n} is out of range (1-{})",
                self.entities.len()
            ));
        }
        if self.removed[n - 1] {
            return Err(format!("Entity {n} was already removed"));
        }
        Ok(n - 1)
    }

    fn listing(&self, title: &str) -> String {
        let mut out = format!("Entities in \"{title}\":");
        for (i, entity) in self.entities.iter().enumerate() {
            if !self.removed[i] {
                out.push_str(&format!(
                    "\n  {}. {} [{}] ({:.2})",
                    i + 1,
                    entity.name,
                    entity.entity_type,
                    entity.confidence
                ));
            }
        }
        out
    }

    fn apply(&mut self, command: Command, session: &dyn ReviewSession) -> Result<bool, String> {
        match command {
            Command::Done => return Ok(false),
            Command::Delete(n) => {
                let i = self.index(n)?;
                self.removed[i] = true;
                self.deleted += 1;
            }
            Command::Edit(n) => {
                let i = self.index(n)?;
                let current = self.entities[i].name.clone();
                let answer = session.prompt(&format!("New name for \"{current}\""), &current);
                let answer = answer.trim();
                if answer.is_empty() || answer == current {
                    return Ok(true);
                }
                self.entities[i].name = answer.to_string();
                self.edited += 1;
            }
            Command::Merge(n, m) => {
                let from = self.index(n)?;
                let into = self.index(m)?;
                if from == into {
                    return Err("Cannot merge an entity into itself".into());
                }
                // Nothing is stored yet, so folding N into M only drops N.
                self.removed[from] = true;
                self.merged += 1;
            }
        }
        Ok(true)
    }

    fn survivors(self) -> Vec<ExtractedEntity> {
        self.entities
            .into_iter()
            .zip(self.removed)
            .filter_map(|(entity, removed)| (!removed).then_some(entity))
            .collect()
    }
}

/// Lets a reviewer delete, rename or fold together a document's entities
/// before they are stored. Passes everything through when the session is
/// disabled or the reviewer declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReviewHook;

impl EntityReviewHook {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BeforeStoreHook for EntityReviewHook {
    fn name(&self) -> &str {
        "entity-review"
    }

    async fn before_store(
        &self,
        document: &ParsedDocument,
        entities: Vec<ExtractedEntity>,
        _graph: &dyn GraphClient,
        session: &dyn ReviewSession,
    ) -> HookResult<Vec<ExtractedEntity>> {
        if !session.enabled() || entities.is_empty() {
            return Ok(entities);
        }

        let mut review = Review::new(entities);
        session.show(&review.listing(&document.title));

        if !session.confirm("Review these entities?", false) {
            return Ok(review.survivors());
        }

        loop {
            let input = session.prompt(COMMAND_HELP, "");
            let outcome = parse_command(&input).and_then(|cmd| review.apply(cmd, session));

            match outcome {
                Ok(false) => break,
                Ok(true) => session.show(&review.listing(&document.title)),
                Err(message) => session.show(&message),
            }
        }

        tracing::debug!(
            "Reviewed {}: {} deleted, {} edited, {} merged",
            document.doc_id,
            review.deleted,
            review.edited,
            review.merged
        );

        Ok(review.survivors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SqliteGraph;
    use crate::review::{ConsoleSession, NonInteractive};
    use std::io::Cursor;

    fn entities() -> Vec<ExtractedEntity> {
        vec![
            ExtractedEntity::new("Person", "Alice", 0.9),
            ExtractedEntity::new("Person", "Bob", 0.8),
            ExtractedEntity::new("Organization", "Acme", 0.7),
        ]
    }

    async fn review(input: &str) -> (Vec<ExtractedEntity>, String) {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let session = ConsoleSession::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let doc = ParsedDocument::new("memo.txt", "...").with_title("Memo");

        let out = EntityReviewHook::new()
            .before_store(&doc, entities(), &graph, &session)
            .await
            .unwrap();

        let transcript = String::from_utf8(session.into_parts().1).unwrap();
        (out, transcript)
    }

    fn names(entities: &[ExtractedEntity]) -> Vec<&str> {
        entities.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  DELETE 2 "), Ok(Command::Delete(2)));
        assert_eq!(parse_command("edit 1"), Ok(Command::Edit(1)));
        assert_eq!(parse_command("Merge 3 1"), Ok(Command::Merge(3, 1)));
        assert_eq!(parse_command("done"), Ok(Command::Done));
        assert_eq!(parse_command(""), Ok(Command::Done));
        assert!(parse_command("delete two").is_err());
        assert!(parse_command("merge 1").is_err());
        assert!(parse_command("rename 1").is_err());
    }

    #[tokio::test]
    async fn test_disabled_session_passes_through() {
        let graph = SqliteGraph::open_memory().await.unwrap();
        let doc = ParsedDocument::new("memo.txt", "...");

        let out = EntityReviewHook::new()
            .before_store(&doc, entities(), &graph, &NonInteractive)
            .await
            .unwrap();

        assert_eq!(out, entities());
    }

    #[tokio::test]
    async fn test_declined_review_passes_through() {
        let (out, transcript) = review("n\n").await;
        assert_eq!(out, entities());
        assert!(transcript.contains("  2. Bob [Person] (0.80)"));
    }

    #[tokio::test]
    async fn test_delete_then_done() {
        let (out, _) = review("y\ndelete 2\ndone\n").await;
        assert_eq!(names(&out), vec!["Alice", "Acme"]);
    }

    #[tokio::test]
    async fn test_edit_applies_new_name() {
        let (out, _) = review("y\nedit 1\nAlice Smith\nedit 2\n\n\n").await;
        assert_eq!(names(&out), vec!["Alice Smith", "Bob", "Acme"]);
    }

    #[tokio::test]
    async fn test_merge_drops_source() {
        let (out, _) = review("y\nmerge 1 2\nmerge 2 2\n\n").await;
        assert_eq!(names(&out), vec!["Bob", "Acme"]);
    }

    #[tokio::test]
    async fn test_bad_commands_are_reported_not_fatal() {
        let (out, transcript) = review("y\ndelete 9\nfrobnicate\ndelete 3\ndelete 3\nDONE\n").await;

        assert_eq!(names(&out), vec!["Alice", "Bob"]);
        assert!(transcript.contains("9 is out of range (1-3)"));
        assert!(transcript.contains("Unknown command: 'frobnicate'"));
        assert!(transcript.contains("Entity 3 was already removed"));
    }

    #[tokio::test]
    async fn test_end_of_input_finishes_review() {
        let (out, _) = review("y\ndelete 1\n").await;
        assert_eq!(names(&out), vec!["Bob", "Acme"]);
    }
}
