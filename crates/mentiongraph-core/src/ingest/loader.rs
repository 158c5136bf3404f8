use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::document::ParsedDocument;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Produces the documents of a source directory.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Every document under `root`, in a stable order.
    async fn load(&self, root: &Path) -> LoadResult<Vec<ParsedDocument>>;
}

/// Loads UTF-8 text and markdown files from a directory tree.
///
/// Document ids are paths relative to the root with `/` separators, so the
/// same tree yields the same ids on every platform. Markdown files are titled
/// by their first heading, everything else by the file stem. Files that are
/// not valid UTF-8 are skipped with a warning.
#[derive(Debug, Clone)]
pub struct PlainTextLoader {
    extensions: Vec<String>,
}

impl Default for PlainTextLoader {
    fn default() -> Self {
        Self {
            extensions: vec!["txt".into(), "md".into(), "markdown".into()],
        }
    }
}

impl PlainTextLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    async fn collect_files(&self, root: &Path) -> LoadResult<Vec<PathBuf>> {
        let mut pending = vec![root.to_path_buf()];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && self.accepts(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    async fn load(&self, root: &Path) -> LoadResult<Vec<ParsedDocument>> {
        if !tokio::fs::metadata(root).await?.is_dir() {
            return Err(LoadError::NotADirectory(root.to_path_buf()));
        }

        let mut documents = Vec::new();

        for path in self.collect_files(root).await? {
            let data = tokio::fs::read(&path).await?;
            let Ok(text) = String::from_utf8(data) else {
                tracing::warn!("Skipping {}: not valid UTF-8", path.display());
                continue;
            };

            let doc_id = relative_id(root, &path);
            let title = if is_markdown(&path) {
                first_heading(&text)
            } else {
                None
            }
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| doc_id.clone());

            documents.push(
                ParsedDocument::new(doc_id, text)
                    .with_title(title)
                    .with_source_file(path),
            );
        }

        tracing::debug!("Loaded {} documents from {}", documents.len(), root.display());
        Ok(documents)
    }
}

fn relative_id(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
}

/// Text of the first ATX heading (`# Title` through `###### Title`).
fn first_heading(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let trimmed = line.trim_start();
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if !(1..=6).contains(&level) || !trimmed[level..].starts_with(' ') {
            return None;
        }

        let title = trimmed[level..].trim();
        (!title.is_empty()).then(|| title.to_string())
    })
}
