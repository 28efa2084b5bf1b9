// Evaluation module
// Recall@K over labelled query sets and prediction generation against a running server


pub mod predictions;

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, info};

use crate::catalog::find_column;
use crate::{RecommenderError, Result};

pub use predictions::{PredictionClient, PredictionSummary, generate_predictions};

pub const QUERY_COLUMN: &str = "Query";
pub const ASSESSMENT_URL_COLUMN: &str = "Assessment_url";

/// Urls per query, in first-seen query order
pub type QueryUrls = Vec<(String, Vec<String>)>;

/// Fraction of the relevant urls found in the first `k` predictions
#[inline]
pub fn recall_at_k(ground_truth: &HashSet<String>, predicted: &[String], k: usize) -> f64 {
    if ground_truth.is_empty() {
        return 0.0;
    }

    let hits = predicted
        .iter()
        .take(k)
        .filter(|url| ground_truth.contains(*url))
        .count();

    hits as f64 / ground_truth.len() as f64
}

/// Recall of one ground-truth query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecall {
    pub query: String,
    pub relevant: usize,
    pub predicted: usize,
    pub recall: f64,
}

/// Per-query recall plus the mean over every ground-truth query
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub k: usize,
    pub queries: Vec<QueryRecall>,
    pub mean_recall: f64,
}

/// Score `predictions` against `ground_truth`; queries without predictions score 0
#[inline]
pub fn evaluate(ground_truth: &QueryUrls, predictions: &QueryUrls, k: usize) -> EvaluationReport {
    let predicted: HashMap<&str, &[String]> = predictions
        .iter()
        .map(|(query, urls)| (query.as_str(), urls.as_slice()))
        .collect();

    let queries: Vec<QueryRecall> = ground_truth
        .iter()
        .map(|(query, urls)| {
            let relevant: HashSet<String> = urls.iter().cloned().collect();
            let preds = predicted.get(query.as_str()).copied().unwrap_or_default();
            QueryRecall {
                query: query.clone(),
                relevant: relevant.len(),
                predicted: preds.len(),
                recall: recall_at_k(&relevant, preds, k),
            }
        })
        .collect();

    let mean_recall = if queries.is_empty() {
        0.0
    } else {
        queries.iter().map(|q| q.recall).sum::<f64>() / queries.len() as f64
    };

    EvaluationReport {
        k,
        queries,
        mean_recall,
    }
}

/// Mean Recall@K of a predictions CSV against a ground-truth CSV
#[inline]
pub fn mean_recall_at_k<P: AsRef<Path>, Q: AsRef<Path>>(
    ground_truth_csv: P,
    predictions_csv: Q,
    k: usize,
) -> Result<f64> {
    let ground_truth = load_query_urls(ground_truth_csv)?;
    let predictions = load_query_urls(predictions_csv)?;

    let report = evaluate(&ground_truth, &predictions, k);
    info!(
        "Mean Recall@{} over {} queries: {:.4}",
        k,
        report.queries.len(),
        report.mean_recall
    );
    Ok(report.mean_recall)
}

/// Load a `Query,Assessment_url` CSV grouped by query
#[inline]
pub fn load_query_urls<P: AsRef<Path>>(path: P) -> Result<QueryUrls> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        RecommenderError::Evaluation(format!("Failed to open {}: {e}", path.display()))
    })?;

    let grouped = read_query_urls(file)?;
    debug!("Loaded {} queries from {}", grouped.len(), path.display());
    Ok(grouped)
}

/// Group `Query,Assessment_url` rows by query.
///
/// Rows with a blank query or url are skipped; urls keep row order.
#[inline]
pub fn read_query_urls<R: Read>(source: R) -> Result<QueryUrls> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| RecommenderError::Evaluation(format!("Failed to read headers: {e}")))?
        .clone();
    let query_idx = require_column(&headers, QUERY_COLUMN)?;
    let url_idx = require_column(&headers, ASSESSMENT_URL_COLUMN)?;

    let mut grouped: QueryUrls = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in reader.records() {
        let record = record
            .map_err(|e| RecommenderError::Evaluation(format!("Malformed CSV row: {e}")))?;
        let query = record.get(query_idx).unwrap_or_default();
        let url = record.get(url_idx).unwrap_or_default();
        if query.is_empty() || url.is_empty() {
            continue;
        }

        let position = *positions.entry(query.to_string()).or_insert_with(|| {
            grouped.push((query.to_string(), Vec::new()));
            grouped.len() - 1
        });
        grouped[position].1.push(url.to_string());
    }

    Ok(grouped)
}

/// Header lookup that reports the headers it did find when `wanted` is missing
pub(crate) fn require_column(headers: &csv::StringRecord, wanted: &str) -> Result<usize> {
    find_column(headers, wanted).ok_or_else(|| {
        RecommenderError::Evaluation(format!(
            "'{}' column not found. Found: [{}]",
            wanted,
            headers.iter().join(", ")
        ))
    })
}
