//! In-memory corpus for callers that already hold their chunks.

use super::types::{Chunk, DocumentRef};
use super::{Corpus, CorpusError};

/// Chunks held in memory, one document per chunk, in insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryCorpus {
    chunks: Vec<Chunk>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk, replacing any chunk with the same id in place.
    pub fn upsert(&mut self, chunk: Chunk) {
        match self.chunks.iter_mut().find(|c| c.id == chunk.id) {
            Some(existing) => *existing = chunk,
            None => self.chunks.push(chunk),
        }
    }

    /// Remove a chunk by id, returning whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.chunks.len();
        self.chunks.retain(|c| c.id != id);
        self.chunks.len() != before
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl FromIterator<Chunk> for MemoryCorpus {
    fn from_iter<I: IntoIterator<Item = Chunk>>(iter: I) -> Self {
        let mut corpus = Self::new();
        for chunk in iter {
            corpus.upsert(chunk);
        }
        corpus
    }
}

impl Corpus for MemoryCorpus {
    fn documents(&self) -> Result<Vec<DocumentRef>, CorpusError> {
        Ok(self.chunks.iter().map(|c| DocumentRef::new(&c.id)).collect())
    }

    fn load(&self, document: &DocumentRef) -> Result<Vec<Chunk>, CorpusError> {
        self.chunks
            .iter()
            .find(|c| c.id == document.id)
            .map(|c| vec![c.clone()])
            .ok_or_else(|| CorpusError::NotFound(document.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ChunkTags;

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut corpus = MemoryCorpus::new();
        corpus.upsert(Chunk::new("a", "one", ChunkTags::default()));
        corpus.upsert(Chunk::new("b", "two", ChunkTags::default()));
        corpus.upsert(Chunk::new("a", "three", ChunkTags::default()));

        assert_eq!(corpus.len(), 2);
        let loaded = corpus.load(&DocumentRef::new("a")).unwrap();
        assert_eq!(loaded[0].content, "three");
    }

    #[test]
    fn test_remove_and_missing_document() {
        let mut corpus: MemoryCorpus = [Chunk::new("a", "one", ChunkTags::default())]
            .into_iter()
            .collect();
        assert!(corpus.remove("a"));
        assert!(!corpus.remove("a"));
        assert!(matches!(
            corpus.load(&DocumentRef::new("a")),
            Err(CorpusError::NotFound(_))
        ));
    }
}
