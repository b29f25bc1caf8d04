//! Persistent knowledge index.
//!
//! This module provides:
//! - `KnowledgeIndex`, the index manager (sync, search, compact, rebuild)
//! - Paired on-disk persistence of vectors and metadata
//! - Metadata-filtered search outcomes

mod error;
mod manager;
mod metadata;
mod persistence;
mod search;

pub use error::{IndexError, IndexResult, PersistenceError};
pub use manager::{
    CompactReport, IndexOptions, IndexStats, KnowledgeIndex, SyncProgress, SyncReport,
};
pub use metadata::EntryMetadata;
pub use persistence::{BLOB_FILE, BlobHeader, IndexPaths, SIDECAR_FILE, decode_blob, encode_blob};
pub use search::{
    EMPTY_KNOWLEDGE_BASE, NO_RELEVANT_MATCHES, SearchFilter, SearchHit, SearchOutcome,
};
