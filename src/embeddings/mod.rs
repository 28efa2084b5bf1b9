// Embeddings module
// Text encoders shared by the catalog store and query path

pub mod hashing;
pub mod normalize;
pub mod ollama;

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, EmbeddingProvider};
use crate::{RecommenderError, Result};

pub use hashing::HashingEmbedder;
pub use normalize::{cosine_similarity, l2_normalize_in_place};
pub use ollama::OllamaClient;

/// A text encoder producing fixed-dimension, L2-normalized vectors.
///
/// Implementations must be deterministic: identical input text yields an
/// identical vector, so that rankings are reproducible.
pub trait Embedder: Send + Sync {
    /// Human-readable identifier (model name) used in logs
    fn name(&self) -> &str;

    /// Embed every text, returning one vector per input in the same order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| RecommenderError::Embedding("encoder returned no vector".to_string()))
    }
}

/// Build the encoder selected in the configuration
#[inline]
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedding.provider {
        EmbeddingProvider::Ollama => Arc::new(
            OllamaClient::new(&config.ollama)
                .map_err(|e| RecommenderError::Config(format!("{e:#}")))?,
        ),
        EmbeddingProvider::Hashing => {
            Arc::new(HashingEmbedder::new(config.embedding.dimension as usize))
        }
    };

    info!("Using embedding provider {}", embedder.name());
    Ok(embedder)
}
