// Recommender module
// Scores catalog items against a query and picks the top-k, optionally balanced by category


pub mod query;
pub mod ranking;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogItem, SharedCatalog};
use crate::config::Config;
use crate::embeddings::build_embedder;
use crate::{RecommenderError, Result};

pub use query::QueryNormalizer;
pub use ranking::{ScoredCandidate, rank_candidates, select_balanced, select_top_k};

/// One entry of a recommendation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub assessment_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "test_type")]
    pub category: String,
    #[serde(default)]
    pub score: f32,
}

impl Recommendation {
    #[inline]
    pub fn new(item: &CatalogItem, score: f32) -> Self {
        Self {
            assessment_name: item.name.clone(),
            url: item.url.clone(),
            category: item.category.clone(),
            score,
        }
    }
}

impl From<ScoredCandidate<'_>> for Recommendation {
    #[inline]
    fn from(candidate: ScoredCandidate<'_>) -> Self {
        Self::new(candidate.item, candidate.score)
    }
}

/// Requested result count; absent or 0 falls back to `default`
#[inline]
pub fn effective_top_k(requested: Option<usize>, default: usize) -> usize {
    requested.filter(|k| *k > 0).unwrap_or(default)
}

/// Turns free-text queries into ranked catalog recommendations
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    catalog: Arc<SharedCatalog>,
    normalizer: Option<QueryNormalizer>,
}

impl RecommendationEngine {
    #[inline]
    pub fn new(catalog: Arc<SharedCatalog>) -> Self {
        Self {
            catalog,
            normalizer: None,
        }
    }

    /// Expand shorthand such as `js` or `ml` before embedding queries
    #[inline]
    pub fn with_synonym_expansion(mut self, enabled: bool) -> Result<Self> {
        self.normalizer = if enabled {
            Some(QueryNormalizer::new()?)
        } else {
            None
        };
        Ok(self)
    }

    /// Engine over the configured catalog file and encoder.
    ///
    /// The catalog itself is loaded lazily on the first recommendation.
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = build_embedder(config)?;
        let catalog = SharedCatalog::from_path(config.catalog_path(), embedder);
        Self::new(Arc::new(catalog)).with_synonym_expansion(config.recommender.expand_synonyms)
    }

    #[inline]
    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }

    /// Force catalog initialization, returning the number of items
    #[inline]
    pub fn warm_up(&self) -> Result<usize> {
        self.catalog.get().map(|store| store.len())
    }

    /// Recommend up to `top_k` assessments for `query`.
    ///
    /// Blank queries yield an empty list without touching the catalog.
    #[inline]
    pub fn recommend(
        &self,
        query: &str,
        top_k: usize,
        balance_by_category: bool,
    ) -> Result<Vec<Recommendation>> {
        if query.trim().is_empty() {
            debug!("Blank query, returning no recommendations");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let store = self.catalog.get()?;

        let text = match &self.normalizer {
            Some(normalizer) => normalizer.normalize(query),
            None => query.to_string(),
        };
        let query_embedding = self.catalog.embedder().embed_one(&text)?;

        if !store.is_empty() && query_embedding.len() != store.dimension() {
            return Err(RecommenderError::Embedding(format!(
                "Query embedding has dimension {}, catalog uses {}",
                query_embedding.len(),
                store.dimension()
            )));
        }

        let ranking = rank_candidates(&store, &query_embedding);
        let selected = if balance_by_category {
            select_balanced(&ranking, top_k)
        } else {
            select_top_k(&ranking, top_k)
        };

        info!(
            "Recommended {} of {} items (top_k={}, balanced={}) in {:?}",
            selected.len(),
            store.len(),
            top_k,
            balance_by_category,
            started.elapsed()
        );

        Ok(selected.into_iter().map(Recommendation::from).collect())
    }
}
