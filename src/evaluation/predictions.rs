use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::{ASSESSMENT_URL_COLUMN, QUERY_COLUMN};
use crate::recommender::Recommendation;
use crate::{RecommenderError, Result};

const REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    recommendations: Vec<Recommendation>,
}

/// Blocking client for a running recommendation server
#[derive(Debug, Clone)]
pub struct PredictionClient {
    endpoint: Url,
    agent: ureq::Agent,
}

impl PredictionClient {
    #[inline]
    pub fn new(api_base: &str) -> Result<Self> {
        let mut base = Url::parse(api_base).map_err(|e| {
            RecommenderError::Config(format!("Invalid API base URL '{api_base}': {e}"))
        })?;
        // keep any path prefix: `http://host/api` -> `http://host/api/recommend`
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("recommend")
            .map_err(|e| RecommenderError::Config(format!("Invalid API base URL: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self { endpoint, agent })
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Non-empty recommendation urls for `query`, in ranked order
    #[inline]
    pub fn fetch_urls(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let body = serde_json::to_string(&PredictionRequest { query })
            .context("Failed to serialize prediction request")?;

        let text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Request to {} failed", self.endpoint))?;

        let response: PredictionResponse =
            serde_json::from_str(&text).context("Failed to parse recommendation response")?;

        Ok(response
            .recommendations
            .into_iter()
            .map(|rec| rec.url)
            .filter(|url| !url.is_empty())
            .collect())
    }
}

/// Outcome of a prediction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionSummary {
    pub queries: usize,
    pub rows: usize,
}

/// Read the query column (matched case-insensitively) of a test CSV
#[inline]
pub fn read_test_queries<P: AsRef<Path>>(test_csv: P) -> Result<Vec<String>> {
    let path = test_csv.as_ref();
    let file = File::open(path).map_err(|e| {
        RecommenderError::Evaluation(format!("Failed to open {}: {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| RecommenderError::Evaluation(format!("Failed to read headers: {e}")))?
        .clone();
    let column = super::require_column(&headers, QUERY_COLUMN).map_err(|e| {
        RecommenderError::Evaluation(format!("{e} in {}", path.display()))
    })?;

    let mut queries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| RecommenderError::Evaluation(format!("Malformed CSV row: {e}")))?;
        let query = record.get(column).unwrap_or_default().trim();
        if query.is_empty() {
            warn!("Skipping blank query at line {}", index + 2);
            continue;
        }
        queries.push(query.to_string());
    }

    Ok(queries)
}

/// Query the server at `api_base` for every test query and write
/// `Query,Assessment_url` rows to `out_csv`
#[inline]
pub fn generate_predictions<P: AsRef<Path>, Q: AsRef<Path>>(
    test_csv: P,
    api_base: &str,
    out_csv: Q,
) -> Result<PredictionSummary> {
    let queries = read_test_queries(&test_csv)?;
    let client = PredictionClient::new(api_base)?;
    info!(
        "Generating predictions for {} queries via {}",
        queries.len(),
        client.endpoint()
    );

    let bar = if console::Term::stderr().is_term() {
        ProgressBar::new(queries.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
    } else {
        ProgressBar::hidden()
    };

    let out_path = out_csv.as_ref();
    let mut writer = csv::Writer::from_path(out_path).map_err(|e| {
        RecommenderError::Evaluation(format!("Failed to create {}: {e}", out_path.display()))
    })?;
    writer
        .write_record([QUERY_COLUMN, ASSESSMENT_URL_COLUMN])
        .map_err(|e| RecommenderError::Evaluation(format!("Failed to write header: {e}")))?;

    let mut rows = 0;
    for query in &queries {
        bar.set_message(query.clone());

        let urls = client
            .fetch_urls(query)
            .map_err(|e| RecommenderError::Evaluation(format!("{e:#}")))?;
        debug!("{} urls for query '{}'", urls.len(), query);

        for url in &urls {
            writer
                .write_record([query.as_str(), url.as_str()])
                .map_err(|e| RecommenderError::Evaluation(format!("Failed to write row: {e}")))?;
            rows += 1;
        }
        bar.inc(1);
    }

    writer.flush()?;
    bar.finish_and_clear();

    info!("Wrote {} prediction rows to {}", rows, out_path.display());
    Ok(PredictionSummary {
        queries: queries.len(),
        rows,
    })
}
