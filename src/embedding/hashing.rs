//! Deterministic feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed into one of `dimension`
//! buckets with a hash-derived sign. Texts that share words land close
//! together, which is enough for offline runs and for tests that must not
//! touch the network or download a model. Text without any alphanumeric
//! token falls back to hashing its non-whitespace characters, so only
//! whitespace embeds to the zero vector.

use super::{EmbeddingError, EmbeddingGenerator};
use crate::vector::VectorDimension;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: VectorDimension,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            model_id: format!("hashing-{dimension}"),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let dim = self.dimension.get();
        let mut vector = vec![0.0f32; dim];

        let mut tokens: Vec<String> = tokenize(text).collect();
        if tokens.is_empty() {
            tokens = text
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect();
        }

        for token in tokens {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % dim as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        vector
    }
}

impl EmbeddingGenerator for HashingEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
