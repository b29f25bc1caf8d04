//! Validated access to an embedding generator.

use super::{EmbeddingError, EmbeddingGenerator};
use crate::vector::{VectorDimension, normalize};

/// Wraps a generator, batches calls, and validates every returned vector.
///
/// Returned vectors are L2-normalized, so inner product on them is cosine
/// similarity.
pub struct EmbeddingGateway {
    generator: Box<dyn EmbeddingGenerator>,
    batch_size: usize,
}

impl std::fmt::Debug for EmbeddingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGateway")
            .field("model_id", &self.generator.model_id())
            .field("dimension", &self.generator.dimension())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl EmbeddingGateway {
    pub fn new(generator: Box<dyn EmbeddingGenerator>, batch_size: usize) -> Self {
        Self {
            generator,
            batch_size: batch_size.max(1),
        }
    }

    pub fn dimension(&self) -> VectorDimension {
        self.generator.dimension()
    }

    pub fn model_id(&self) -> &str {
        self.generator.model_id()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.generator.generate_embeddings(&[text])?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::Malformed(format!(
                "expected 1 embedding, got {}",
                vectors.len()
            )));
        }
        self.validate(vectors.remove(0))
    }

    /// Embed texts, one outcome per input in input order.
    ///
    /// Texts are sent in batches of `batch_size`. When a whole batch fails, each
    /// text in it is retried alone so that one bad input only costs itself.
    pub fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Vec<f32>, EmbeddingError>> {
        let mut outcomes = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            match self.generator.generate_embeddings(batch) {
                Ok(vectors) if vectors.len() == batch.len() => {
                    outcomes.extend(vectors.into_iter().map(|v| self.validate(v)));
                }
                Ok(vectors) => {
                    tracing::warn!(
                        target: "embedding",
                        "batch returned {} embeddings for {} inputs, retrying one by one",
                        vectors.len(),
                        batch.len()
                    );
                    outcomes.extend(batch.iter().map(|text| self.embed(text)));
                }
                Err(e) if batch.len() > 1 => {
                    tracing::warn!(
                        target: "embedding",
                        "batch of {} failed ({e}), retrying one by one",
                        batch.len()
                    );
                    outcomes.extend(batch.iter().map(|text| self.embed(text)));
                }
                Err(e) => outcomes.push(Err(e)),
            }
        }

        outcomes
    }

    fn validate(&self, mut vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
        if vector.is_empty() {
            return Err(EmbeddingError::Malformed("empty vector".to_string()));
        }
        self.dimension()
            .validate(&vector)
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;
        normalize(&mut vector).map_err(|e| EmbeddingError::Malformed(e.to_string()))?;
        Ok(vector)
    }
}
