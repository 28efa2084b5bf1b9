// Catalog module
// Loads the assessment catalog and keeps the per-item embeddings alongside it


pub mod category;
pub mod store;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{RecommenderError, Result};

pub use category::{Category, guess_category};
pub use store::{CatalogSource, CatalogStore, SharedCatalog};

pub const NAME_COLUMN: &str = "Assessment Name";
pub const URL_COLUMN: &str = "URL";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const CATEGORY_COLUMN: &str = "Test Type";

/// A single assessment in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub url: String,
    pub description: String,
    /// Category label, e.g. `K`, `P` or a source value such as `K, P`
    pub category: String,
}

impl CatalogItem {
    /// Build an item, guessing the category when `category` is blank
    #[inline]
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
        category: Option<&str>,
    ) -> Self {
        let name = name.into();
        let url = url.into();
        let description = description.into();
        let category = match category.map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => guess_category(&name, &url, &description).to_string(),
        };

        Self {
            name,
            url,
            description,
            category,
        }
    }

    /// Text fed to the encoder: `name description`
    #[inline]
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }

    /// Label contains `K` (case-insensitive)
    #[inline]
    pub fn is_knowledge(&self) -> bool {
        self.category.to_uppercase().contains('K')
    }

    /// Label contains `P` (case-insensitive)
    #[inline]
    pub fn is_personality(&self) -> bool {
        self.category.to_uppercase().contains('P')
    }
}

/// Column positions resolved from the CSV header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CatalogColumns {
    name: usize,
    url: Option<usize>,
    description: Option<usize>,
    category: Option<usize>,
}

impl CatalogColumns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let name = find_column(headers, NAME_COLUMN).ok_or_else(|| {
            RecommenderError::CatalogLoad(format!(
                "Catalog must have '{}' column. Found: {:?}",
                NAME_COLUMN,
                headers.iter().collect::<Vec<_>>()
            ))
        })?;

        Ok(Self {
            name,
            url: find_column(headers, URL_COLUMN),
            description: find_column(headers, DESCRIPTION_COLUMN),
            category: find_column(headers, CATEGORY_COLUMN),
        })
    }
}

/// Exact header match first, then a trimmed case-insensitive one
/// (a UTF-8 byte order mark on the first header is ignored)
pub(crate) fn find_column(headers: &csv::StringRecord, wanted: &str) -> Option<usize> {
    headers.iter().position(|h| h == wanted).or_else(|| {
        headers.iter().position(|h| {
            h.trim_start_matches('\u{feff}')
                .trim()
                .eq_ignore_ascii_case(wanted)
        })
    })
}

/// Load the catalog CSV at `path`
#[inline]
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<CatalogItem>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(RecommenderError::CatalogLoad(format!(
            "Catalog not found at {}",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|e| {
        RecommenderError::CatalogLoad(format!("Failed to open {}: {e}", path.display()))
    })?;

    let items = read_catalog(file)?;
    info!("Loaded {} catalog items from {}", items.len(), path.display());
    Ok(items)
}

/// Parse catalog rows from any CSV source.
///
/// Missing optional columns are synthesized: `URL` and `Description` become
/// empty text and `Test Type` is guessed per row. Rows without a name are
/// skipped.
#[inline]
pub fn read_catalog<R: Read>(source: R) -> Result<Vec<CatalogItem>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| RecommenderError::CatalogLoad(format!("Failed to read headers: {e}")))?
        .clone();
    let columns = CatalogColumns::resolve(&headers)?;

    if columns.category.is_none() {
        debug!("No '{}' column, guessing categories", CATEGORY_COLUMN);
    }

    let mut items = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = record.map_err(|e| {
            RecommenderError::CatalogLoad(format!("Failed to read row at line {line}: {e}"))
        })?;

        let name = field(&record, Some(columns.name));
        if name.is_empty() {
            warn!("Skipping catalog row at line {} without a name", line);
            continue;
        }

        let category = columns.category.map(|_| field(&record, columns.category));
        items.push(CatalogItem::new(
            name,
            field(&record, columns.url),
            field(&record, columns.description),
            category,
        ));
    }

    Ok(items)
}

/// Trimmed cell value; absent columns and short rows read as empty text
fn field(record: &csv::StringRecord, column: Option<usize>) -> &str {
    column
        .and_then(|idx| record.get(idx))
        .map_or("", str::trim)
}
