use std::path::PathBuf;
use thiserror::Error;

use crate::corpus::CorpusError;
use crate::embedding::EmbeddingError;
use crate::vector::VectorError;

/// Errors writing or reading the persisted artifacts.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cannot encode index: {0}")]
    Encode(String),
}

/// Errors from the knowledge index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbeddingError),

    #[error("Corpus read failed: {0}")]
    CorpusRead(#[from] CorpusError),

    #[error("Index at {} is corrupt: {reason}", path.display())]
    IndexCorrupt { path: PathBuf, reason: String },

    #[error("Index at {} was built with {found} but the embedder is {expected}", path.display())]
    IncompatibleIndex {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector data: {0}")]
    InvalidVectors(VectorError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Failed to persist index: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Whether a later attempt may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_) | Self::CorpusRead(_))
    }

    /// Short remediation hint for CLI output.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::EmbeddingUnavailable(_) => {
                Some("Check the embedding provider settings and try again")
            }
            Self::IndexCorrupt { .. } | Self::InvalidVectors(_) => {
                Some("Run 'kbi rebuild' to re-create the index")
            }
            Self::IncompatibleIndex { .. } => {
                Some("Run 'kbi rebuild' after changing the embedding model")
            }
            _ => None,
        }
    }
}

impl From<VectorError> for IndexError {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            other => Self::InvalidVectors(other),
        }
    }
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
