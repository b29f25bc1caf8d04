//! Embedding generation.
//!
//! `EmbeddingGenerator` is the seam to whatever produces vectors: a hosted
//! OpenAI-compatible API, a local fastembed model, or the deterministic
//! hashing embedder used in tests. `EmbeddingGateway` wraps a generator and
//! owns the validation rules, so the index never sees an empty, ragged, or
//! non-finite vector.

mod gateway;
mod hashing;
mod local;
mod openai;

pub use gateway::EmbeddingGateway;
pub use hashing::HashingEmbedder;
pub use local::{FastEmbedGenerator, parse_embedding_model};
pub use openai::OpenAiEmbedder;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::vector::VectorDimension;
use thiserror::Error;

/// Errors from embedding providers.
///
/// Every variant is reported upstream as "embedding unavailable"; the
/// distinction only matters for logs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding request timed out")]
    Timeout,

    #[error("Malformed embedding response: {0}")]
    Malformed(String),

    #[error("Invalid embedding configuration: {0}")]
    Config(String),
}

/// Produces embeddings for text.
pub trait EmbeddingGenerator: Send + Sync {
    /// Embed each text. Must return exactly one vector per input, in order.
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Width of the vectors this generator produces.
    fn dimension(&self) -> VectorDimension;

    /// Stable identifier of the model, stored alongside the index.
    fn model_id(&self) -> &str;
}

/// Build the generator selected in settings.
pub fn create_generator(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingGenerator>, EmbeddingError> {
    let dimension = VectorDimension::new(config.dimension)
        .map_err(|e| EmbeddingError::Config(e.to_string()))?;

    let generator: Box<dyn EmbeddingGenerator> = match config.provider {
        EmbeddingProvider::OpenAi => Box::new(OpenAiEmbedder::from_config(config, dimension)?),
        EmbeddingProvider::FastEmbed => Box::new(FastEmbedGenerator::from_settings(&config.model)?),
        EmbeddingProvider::Hashing => Box::new(HashingEmbedder::new(dimension)),
    };

    if generator.dimension() != dimension {
        return Err(EmbeddingError::Config(format!(
            "model {} produces {}-dimensional vectors but embedding.dimension is {}",
            generator.model_id(),
            generator.dimension(),
            dimension
        )));
    }

    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hashing_generator() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Hashing,
            dimension: 32,
            ..Default::default()
        };
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.dimension().get(), 32);
        assert_eq!(generator.model_id(), "hashing-32");
    }

    #[test]
    fn test_zero_dimension_is_config_error() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Hashing,
            dimension: 0,
            ..Default::default()
        };
        assert!(matches!(
            create_generator(&config),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    fn test_openai_without_key_fails() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::OpenAi,
            api_key_env: "KBI_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_generator(&config),
            Err(EmbeddingError::MissingApiKey(_))
        ));
    }
}
