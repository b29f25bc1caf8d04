//! The knowledge-base corpus.
//!
//! This module provides:
//! - The `Corpus` trait the index manager scans during synchronization
//! - A directory-backed corpus with JSON metadata sidecars
//! - An in-memory corpus for embedding callers and tests
//! - Optional sentence chunking of long documents

pub mod chunker;
pub mod directory;
pub mod memory;
pub mod types;

pub use chunker::{Chunker, SentenceChunker, WholeDocument};
pub use directory::{DirectoryCorpus, detect_category};
pub use memory::MemoryCorpus;
pub use types::{Chunk, ChunkTags, DEFAULT_CONTENT_TYPE, DEFAULT_TAG, DocumentRef, tag_or_default};

use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading the corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Corpus root not found: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("Failed to walk corpus: {0}")]
    Walk(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document is not valid UTF-8: {}", path.display())]
    Decode { path: PathBuf },

    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Source of chunks for synchronization.
///
/// `documents` failing aborts a pass; `load` failing only costs that
/// document's chunks for this pass.
pub trait Corpus: Send + Sync {
    /// Enumerate documents in a stable order.
    fn documents(&self) -> Result<Vec<DocumentRef>, CorpusError>;

    /// Read a document and split it into chunks.
    fn load(&self, document: &DocumentRef) -> Result<Vec<Chunk>, CorpusError>;
}
