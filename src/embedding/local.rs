//! Local embedding generation with fastembed.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{EmbeddingError, EmbeddingGenerator};
use crate::vector::VectorDimension;

/// Runs an ONNX embedding model in-process.
///
/// The model needs `&mut self` to embed, so it sits behind a mutex.
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    dimension: VectorDimension,
    model_id: String,
}

impl FastEmbedGenerator {
    /// Create with the default model (AllMiniLML6V2, 384 dimensions).
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, "AllMiniLML6V2")
    }

    /// Create from a model name as written in settings.
    pub fn from_settings(model_name: &str) -> Result<Self, EmbeddingError> {
        let model = parse_embedding_model(model_name)?;
        Self::with_model(model, model_name)
    }

    fn with_model(model: EmbeddingModel, model_id: &str) -> Result<Self, EmbeddingError> {
        tracing::info!(target: "embedding", "loading local embedding model {model_id}");

        let mut text_model =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(true))
                .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        // Embed one sample to learn the output width
        let sample = text_model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;
        let width = sample.first().map(Vec::len).unwrap_or(0);
        let dimension =
            VectorDimension::new(width).map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
            model_id: model_id.to_string(),
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::Request("embedding model lock poisoned".to_string()))?;
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Request(e.to_string()))
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Map a settings string to a fastembed model.
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        "MultilingualE5Base" => Ok(EmbeddingModel::MultilingualE5Base),
        "ParaphraseMLMiniLML12V2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        other => Err(EmbeddingError::Config(format!(
            "unknown fastembed model '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_models() {
        assert!(matches!(
            parse_embedding_model("AllMiniLML6V2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            parse_embedding_model("MultilingualE5Small"),
            Ok(EmbeddingModel::MultilingualE5Small)
        ));
    }

    #[test]
    fn test_parse_unknown_model() {
        assert!(matches!(
            parse_embedding_model("text-embedding-3-small"),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    #[ignore = "Downloads 86MB model - run with --ignored"]
    fn test_local_model_dimension() {
        let generator = FastEmbedGenerator::new().unwrap();
        assert_eq!(generator.dimension().get(), 384);
        let vectors = generator
            .generate_embeddings(&["Student visa requires proof of funds"])
            .unwrap();
        assert_eq!(vectors[0].len(), 384);
    }
}
