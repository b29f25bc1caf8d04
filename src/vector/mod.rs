//! Vector storage and nearest-neighbour search.
//!
//! The index is append-only: rows are immutable once added and row position
//! equals insertion order. All vectors are L2-normalized before insertion, so
//! inner product equals cosine similarity.

mod flat;
mod types;

pub use flat::{FlatIndex, VectorIndex, inner_product, normalize};
pub use types::{
    RowId, VECTOR_DIMENSION_384, VECTOR_DIMENSION_1536, VectorDimension, VectorError,
};
