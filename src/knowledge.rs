use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::LoadError;

/// One stored question and its canned answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
}

/// Ordered, read-only list of entries. The position of an entry is its id and
/// matches the row of its vector in the similarity index.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    entries: Vec<QaEntry>,
}

impl KnowledgeStore {
    pub fn new(entries: Vec<QaEntry>) -> Self {
        KnowledgeStore { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, or `None` past the end of the store.
    pub fn get(&self, index: usize) -> Option<&QaEntry> {
        self.entries.get(index)
    }

    pub fn questions(&self) -> Vec<&str> {
        self.iter().map(|e| e.question.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QaEntry> {
        self.entries.iter()
    }
}

/// Loads the whole store from a JSON array of `{question, answer}` objects.
/// Either every record parses or nothing is returned.
pub fn load_knowledge(path: impl AsRef<Path>) -> Result<KnowledgeStore, LoadError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let entries: Vec<QaEntry> = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), entries = entries.len(), "knowledge store loaded");
    Ok(KnowledgeStore::new(entries))
}
