use tracing::info;

use crate::error::IndexError;
use crate::knowledge::{KnowledgeStore, QaEntry};
use crate::vector_db::TfidfIndex;

/// Closest stored entry for a query.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub index: usize,
    pub entry: &'a QaEntry,
    pub score: f32,
}

/// The knowledge store together with the index built over its questions.
/// Both are immutable once constructed.
pub struct Retriever {
    store: KnowledgeStore,
    index: TfidfIndex,
}

impl Retriever {
    pub fn new(store: KnowledgeStore) -> Result<Self, IndexError> {
        if store.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }
        let index = TfidfIndex::build(store.questions().as_slice())?;
        info!(
            entries = index.len(),
            vocabulary = index.vocabulary_len(),
            "similarity index built"
        );
        Ok(Retriever { store, index })
    }

    /// `None` only if the index returns a row the store does not have,
    /// which cannot happen for a retriever built by `new`.
    pub fn best_match(&self, query: &str) -> Option<Match<'_>> {
        let (index, score) = self.index.best(query);
        let entry = self.store.get(index)?;
        Some(Match {
            index,
            entry,
            score,
        })
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }
}
