
use fxhash::hash64;
use tracing::debug;

use crate::Result;
use crate::embeddings::Embedder;
use crate::embeddings::normalize::l2_normalize_in_place;

pub const DEFAULT_HASHING_DIMENSION: u32 = 384;

/// Deterministic feature-hashing encoder.
///
/// Each lowercase word token is hashed into one of `dimension` buckets with a
/// hash-derived sign, and the resulting bag-of-words vector is L2-normalized.
/// Similarity is purely lexical; it exists so the service can run and be tested
/// without a model server.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    name: String,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            name: format!("hashing-{dimension}"),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for token in tokenize(text) {
            let h = hash64(token.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

impl Default for HashingEmbedder {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION as usize)
    }
}

impl Embedder for HashingEmbedder {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!("Hashing {} texts into {} dimensions", texts.len(), self.dimension);
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Lowercase word tokens; `#`, `+` and `.` stay inside tokens so that names
/// like `c#`, `c++` and `.net` survive.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '#' | '+' | '.')))
        .map(|token| token.trim_end_matches('.').to_lowercase())
        .filter(|token| !token.is_empty())
}
