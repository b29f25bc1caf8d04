//! Core types for the vector index.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Embedding width used by `text-embedding-3-small`.
pub const VECTOR_DIMENSION_1536: usize = 1536;

/// Embedding width used by `AllMiniLML6V2`.
pub const VECTOR_DIMENSION_384: usize = 384;

/// Errors from vector index operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error("Invalid vector dimension: {0} (must be greater than zero)")]
    InvalidDimension(usize),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector contains non-finite values")]
    NonFinite,

    #[error("Vector has zero magnitude and cannot be normalized")]
    ZeroMagnitude,

    #[error("Corrupt vector data: {0}")]
    Corrupt(String),
}

/// Fixed width of every vector in one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Create a dimension, rejecting zero.
    pub fn new(value: usize) -> Result<Self, VectorError> {
        if value == 0 {
            return Err(VectorError::InvalidDimension(value));
        }
        Ok(Self(value))
    }

    pub fn dimension_1536() -> Self {
        Self(VECTOR_DIMENSION_1536)
    }

    pub fn dimension_384() -> Self {
        Self(VECTOR_DIMENSION_384)
    }

    pub fn get(&self) -> usize {
        self.0
    }

    /// Check that a vector has exactly this width.
    pub fn validate(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a row in the index. Insertion order == row position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowId(usize);

impl RowId {
    pub fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_dimension_rejected() {
        assert_eq!(
            VectorDimension::new(0),
            Err(VectorError::InvalidDimension(0))
        );
    }

    #[test]
    fn test_dimension_validate() {
        let dim = VectorDimension::new(3).unwrap();
        assert!(dim.validate(&[0.1, 0.2, 0.3]).is_ok());
        assert_eq!(
            dim.validate(&[0.1, 0.2]),
            Err(VectorError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_row_ordering_follows_position() {
        assert!(RowId::new(1) < RowId::new(2));
        assert_eq!(RowId::new(7).to_string(), "#7");
    }
}
