//! Retrieval engine for a tagged knowledge base.
//!
//! Keeps a persistent similarity index over corpus chunks, re-embedding only
//! content it has not seen, and answers similarity queries restricted by
//! country and category.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod fingerprint;
pub mod index;
pub mod logging;
pub mod vector;

pub use config::Settings;
pub use corpus::{Chunk, ChunkTags, Corpus, CorpusError, DirectoryCorpus, MemoryCorpus};
pub use embedding::{EmbeddingError, EmbeddingGateway, EmbeddingGenerator, HashingEmbedder};
pub use fingerprint::Fingerprint;
pub use index::{
    CompactReport, IndexError, IndexOptions, KnowledgeIndex, SearchFilter, SearchHit,
    SearchOutcome, SyncProgress, SyncReport,
};
pub use vector::{FlatIndex, RowId, VectorDimension, VectorIndex};
