use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tracing::{info, warn};

use crate::config::{Config, EmbeddingProvider};
use crate::embeddings::OllamaClient;
use crate::evaluation::{evaluate, generate_predictions, load_query_urls};
use crate::recommender::{RecommendationEngine, effective_top_k};
use crate::server::start_server;

/// Start the HTTP server
#[inline]
pub async fn serve(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    if config.embedding.provider == EmbeddingProvider::Ollama {
        check_ollama(&config).await;
    }

    println!(
        "🌐 Serving recommendations on http://{}:{}",
        config.server.host, config.server.port
    );
    println!("Press Ctrl+C to stop the server");

    start_server(&config).await
}

/// Warn early when the encoder is unreachable; the catalog loads lazily so
/// the server still starts
async fn check_ollama(config: &Config) {
    let client = match OllamaClient::new(&config.ollama) {
        Ok(client) => client,
        Err(e) => {
            warn!("⚠️  Invalid Ollama settings: {}", e);
            return;
        }
    };

    match tokio::task::spawn_blocking(move || client.health_check()).await {
        Ok(Ok(dimension)) => info!(
            "✅ Ollama connected at {}:{} with model {} ({} dimensions)",
            config.ollama.host, config.ollama.port, config.ollama.model, dimension
        ),
        Ok(Err(e)) => {
            warn!("⚠️  Ollama is not ready: {:#}", e);
            println!(
                "Warning: Cannot reach model {} at {}:{}. Requests will fail until it is available.",
                config.ollama.model, config.ollama.host, config.ollama.port
            );
            println!("Use 'assessment-recommender config' to update connection settings.");
        }
        Err(e) => warn!("⚠️  Ollama health check did not complete: {}", e),
    }
}

/// Print a ranked table of recommendations for `query`
#[inline]
pub fn recommend(
    config_dir: &Path,
    query: &str,
    top_k: Option<usize>,
    no_balance: bool,
) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let engine = RecommendationEngine::from_config(&config)?;

    let top_k = effective_top_k(top_k, config.recommender.default_top_k);
    let balance = !no_balance && config.recommender.balance_by_default;

    let recommendations = engine.recommend(query, top_k, balance)?;

    if recommendations.is_empty() {
        println!("No recommendations.");
        return Ok(());
    }

    println!(
        "{}",
        style(format!("Top {} for \"{}\"", recommendations.len(), query.trim())).bold()
    );
    println!();
    println!(
        "{:>3}  {:<6}  {:<8}  {}",
        style("#").dim(),
        style("Score").dim(),
        style("Category").dim(),
        style("Assessment").dim()
    );

    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{:>3}  {:<6.4}  {:<8}  {}",
            rank + 1,
            rec.score,
            rec.category,
            style(&rec.assessment_name).cyan()
        );
        if !rec.url.is_empty() {
            println!("{:>3}  {:<6}  {:<8}  {}", "", "", "", style(&rec.url).dim());
        }
    }

    Ok(())
}

/// Print per-query and mean Recall@K
#[inline]
pub fn evaluate_predictions(ground_truth: &Path, predictions: &Path, k: usize) -> Result<()> {
    let ground_truth = load_query_urls(ground_truth)?;
    let predictions = load_query_urls(predictions)?;

    let report = evaluate(&ground_truth, &predictions, k);

    for query in &report.queries {
        println!(
            "{:.4}  ({} relevant, {} predicted)  {}",
            query.recall, query.relevant, query.predicted, query.query
        );
    }
    println!();
    println!(
        "{}",
        style(format!("Mean Recall@{}: {:.4}", report.k, report.mean_recall)).bold()
    );

    Ok(())
}

/// Call a running server for every test query and write a predictions CSV
#[inline]
pub fn predict(test_csv: &Path, api_base: &str, out_csv: &Path) -> Result<()> {
    let summary = generate_predictions(test_csv, api_base, out_csv)?;

    println!(
        "✅ Wrote {} predictions for {} queries to {}",
        summary.rows,
        summary.queries,
        out_csv.display()
    );
    Ok(())
}
