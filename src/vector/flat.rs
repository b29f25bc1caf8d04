//! Exact inner-product index over normalized vectors.
//!
//! Vectors are stored contiguously in insertion order, so a row's position is
//! its offset divided by the dimension. Search is a full scan: for knowledge
//! bases in the thousands of chunks this is fast enough and gives exact
//! results, which keeps over-fetch arithmetic honest.

use super::types::{RowId, VectorDimension, VectorError};

/// Contract consumed by the index manager.
pub trait VectorIndex: Send + Sync {
    /// Width of every vector in this index.
    fn dimension(&self) -> VectorDimension;

    /// Append rows in input order. Either every vector is appended or none is.
    fn add_batch(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorError>;

    /// Up to `k` rows ordered by descending score, ties by ascending row.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(RowId, f32)>, VectorError>;

    /// Number of rows.
    fn count(&self) -> usize;
}

/// Flat (brute force) index. Scores are inner products.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: VectorDimension,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Rebuild an index from its contiguous row data.
    pub fn from_raw(dimension: VectorDimension, data: Vec<f32>) -> Result<Self, VectorError> {
        if data.len() % dimension.get() != 0 {
            return Err(VectorError::Corrupt(format!(
                "{} values is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::NonFinite);
        }
        Ok(Self { dimension, data })
    }

    /// Contiguous row data, row-major.
    pub fn raw(&self) -> &[f32] {
        &self.data
    }

    /// The stored vector at `row`.
    pub fn vector(&self, row: RowId) -> Option<&[f32]> {
        let dim = self.dimension.get();
        let start = row.get().checked_mul(dim)?;
        self.data.get(start..start + dim)
    }

    /// Drop every row at or after `rows`. Used to roll back an append that
    /// could not be persisted.
    pub(crate) fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows * self.dimension.get());
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn add_batch(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorError> {
        for vector in vectors {
            self.dimension.validate(vector)?;
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(VectorError::NonFinite);
            }
        }

        self.data.reserve(vectors.len() * self.dimension.get());
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(RowId, f32)>, VectorError> {
        self.dimension.validate(query)?;
        if k == 0 || self.data.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(RowId, f32)> = self
            .data
            .chunks_exact(self.dimension.get())
            .enumerate()
            .map(|(row, vector)| (RowId::new(row), inner_product(query, vector)))
            .collect();

        let by_rank = |a: &(RowId, f32), b: &(RowId, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_rank);

        Ok(scored)
    }

    fn count(&self) -> usize {
        self.data.len() / self.dimension.get()
    }
}

/// Dot product of two equal-length vectors.
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale a vector to unit length in place.
pub fn normalize(vector: &mut [f32]) -> Result<(), VectorError> {
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(VectorError::NonFinite);
    }
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return Err(VectorError::ZeroMagnitude);
    }
    for value in vector.iter_mut() {
        *value /= magnitude;
    }
    Ok(())
}
