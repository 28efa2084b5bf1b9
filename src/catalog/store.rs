use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use super::{CatalogItem, load_catalog};
use crate::embeddings::Embedder;
use crate::{RecommenderError, Result};

/// Catalog items with one embedding per item, in catalog order.
///
/// Immutable once built; `items.len() == embeddings.len()` always holds.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    items: Vec<CatalogItem>,
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
}

impl CatalogStore {
    /// Embed every item's `name description` text with `embedder`
    #[inline]
    pub fn build(items: Vec<CatalogItem>, embedder: &dyn Embedder) -> Result<Self> {
        let texts: Vec<String> = items.iter().map(CatalogItem::embedding_text).collect();

        let started = Instant::now();
        let embeddings = embedder.embed(&texts)?;
        debug!(
            "Embedded {} catalog items with {} in {:?}",
            texts.len(),
            embedder.name(),
            started.elapsed()
        );

        Self::from_parts(items, embeddings)
    }

    /// Pair pre-computed embeddings with their items
    #[inline]
    pub fn from_parts(items: Vec<CatalogItem>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if embeddings.len() != items.len() {
            return Err(RecommenderError::Embedding(format!(
                "Encoder returned {} vectors for {} catalog items",
                embeddings.len(),
                items.len()
            )));
        }

        let dimension = embeddings.first().map_or(0, Vec::len);
        if let Some(position) = embeddings.iter().position(|e| e.len() != dimension) {
            return Err(RecommenderError::Embedding(format!(
                "Catalog embedding {} has dimension {}, expected {}",
                position,
                embeddings[position].len(),
                dimension
            )));
        }

        Ok(Self {
            items,
            embeddings,
            dimension,
        })
    }

    #[inline]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    #[inline]
    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// Embedding dimension, 0 for an empty catalog
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items paired with their embeddings, in catalog order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&CatalogItem, &[f32])> {
        self.items
            .iter()
            .zip(self.embeddings.iter().map(Vec::as_slice))
    }
}

/// Where the catalog rows come from
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// CSV file read on first use
    File(PathBuf),
    /// Rows already in memory
    Items(Vec<CatalogItem>),
}

/// Process-wide catalog, loaded and embedded at most once.
///
/// The first caller of [`SharedCatalog::get`] runs load + embed while
/// concurrent callers block on the same cell and then observe the finished
/// store. A failed initialization leaves the cell empty.
pub struct SharedCatalog {
    source: CatalogSource,
    embedder: Arc<dyn Embedder>,
    cell: OnceCell<Arc<CatalogStore>>,
}

impl SharedCatalog {
    #[inline]
    pub fn new(source: CatalogSource, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            source,
            embedder,
            cell: OnceCell::new(),
        }
    }

    #[inline]
    pub fn from_path(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(CatalogSource::File(path.into()), embedder)
    }

    #[inline]
    pub fn from_items(items: Vec<CatalogItem>, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(CatalogSource::Items(items), embedder)
    }

    /// The encoder shared by catalog and query embeddings
    #[inline]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The initialized store, loading and embedding it on first use
    #[inline]
    pub fn get(&self) -> Result<Arc<CatalogStore>> {
        self.cell
            .get_or_try_init(|| self.initialize())
            .map(Arc::clone)
    }

    fn initialize(&self) -> Result<Arc<CatalogStore>> {
        info!("Initializing catalog store");
        let started = Instant::now();

        let items = match &self.source {
            CatalogSource::File(path) => load_catalog(path)?,
            CatalogSource::Items(items) => items.clone(),
        };

        let store = CatalogStore::build(items, self.embedder.as_ref())?;

        info!(
            "Catalog store ready: {} items, dimension {}, took {:?}",
            store.len(),
            store.dimension(),
            started.elapsed()
        );

        Ok(Arc::new(store))
    }
}

impl std::fmt::Debug for SharedCatalog {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCatalog")
            .field("source", &self.source)
            .field("embedder", &self.embedder.name())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
