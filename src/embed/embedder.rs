//! Thin wrapper over `fastembed::TextEmbedding`, the local ONNX-backed
//! embedding collaborator. Model weights are fetched once through
//! `hf-hub` and cached on disk; after that, embedding never touches the
//! network.

use anyhow::{anyhow, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::Path;

/// Supported embedding models, named after their `fastembed::EmbeddingModel`
/// counterpart. `BgeSmallEnV15` is the default: small enough to embed a
/// full repository on a laptop CPU, 384 dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    BgeSmallEnV15,
    AllMiniLmL6V2,
    NomicEmbedTextV15,
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::BgeSmallEnV15
    }
}

impl ModelType {
    /// Full model identifier, as used in `fastembed`'s own model listing.
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::BgeSmallEnV15 => "bge-small-en-v1.5",
            ModelType::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            ModelType::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
        }
    }

    /// Short, filesystem-safe name used in on-disk metadata (`metadata.json`,
    /// `FileMetaStore`).
    pub fn short_name(&self) -> &'static str {
        match self {
            ModelType::BgeSmallEnV15 => "bge-small",
            ModelType::AllMiniLmL6V2 => "minilm-l6",
            ModelType::NomicEmbedTextV15 => "nomic-v1.5",
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            ModelType::BgeSmallEnV15 => 384,
            ModelType::AllMiniLmL6V2 => 384,
            ModelType::NomicEmbedTextV15 => 768,
        }
    }

    fn to_fastembed(self) -> EmbeddingModel {
        match self {
            ModelType::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            ModelType::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            ModelType::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
        }
    }

    /// Parse a model name in any of the forms accepted by `name()` or
    /// `short_name()`. Returns `None` on no match rather than erroring, so
    /// callers can fall back to the default model.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bge-small-en-v1.5" | "bge-small" | "bge" => Some(ModelType::BgeSmallEnV15),
            "all-MiniLM-L6-v2" | "minilm-l6" | "minilm" => Some(ModelType::AllMiniLmL6V2),
            "nomic-embed-text-v1.5" | "nomic-v1.5" | "nomic" => Some(ModelType::NomicEmbedTextV15),
            _ => None,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::parse(s)
    }
}

/// Local ONNX-backed embedder. Not `Send`-free itself, but callers wrap it
/// in `Arc<Mutex<_>>` (see [`crate::embed::batch::BatchEmbedder`]) since
/// the underlying session can't be shared across threads without locking.
pub struct FastEmbedder {
    model: TextEmbedding,
    model_type: ModelType,
}

impl FastEmbedder {
    pub fn new() -> Result<Self> {
        Self::with_cache_dir(ModelType::default(), None)
    }

    pub fn with_cache_dir(model_type: ModelType, cache_dir: Option<&Path>) -> Result<Self> {
        let mut options = InitOptions::new(model_type.to_fastembed()).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir.to_path_buf());
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| anyhow!("failed to load embedding model {}: {e}", model_type.name()))?;

        Ok(Self { model, model_type })
    }

    /// Embed a batch of texts in a single ONNX inference call.
    pub fn embed_batch(&mut self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.model
            .embed(texts, None)
            .map_err(|e| anyhow!("embedding batch failed: {e}"))
    }

    pub fn embed_one(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(vec![text.to_string()])?;
        embeddings
            .pop()
            .ok_or_else(|| anyhow!("embedding model returned no vectors for a single input"))
    }

    pub fn dimensions(&self) -> usize {
        self.model_type.dimensions()
    }

    pub fn model_name(&self) -> &str {
        self.model_type.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_full_and_short_names() {
        assert_eq!(ModelType::parse("bge-small-en-v1.5"), Some(ModelType::BgeSmallEnV15));
        assert_eq!(ModelType::parse("minilm-l6"), Some(ModelType::AllMiniLmL6V2));
        assert_eq!(ModelType::parse("unknown-model"), None);
    }

    #[test]
    fn default_model_has_384_dimensions() {
        assert_eq!(ModelType::default().dimensions(), 384);
    }
}
