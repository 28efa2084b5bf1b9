#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests over a config directory: catalog CSV -> engine -> HTTP -> predictions -> recall
// Uses the hashing encoder so no model server is needed

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use assessment_recommender::config::{Config, EmbeddingProvider};
use assessment_recommender::evaluation::{generate_predictions, mean_recall_at_k};
use assessment_recommender::recommender::RecommendationEngine;
use assessment_recommender::server::{AppState, build_router};

const CATALOG: &str = "\
Assessment Name,URL,Description,Test Type
Core Java (Advanced Level),https://catalog.example/core-java,Java programming and object oriented design,K
Python (New),https://catalog.example/python,Python scripting and data structures,K
SQL Server,https://catalog.example/sql,Relational queries and database design,K
Occupational Personality Questionnaire,https://catalog.example/opq,Personality and work style profile,P
Teamwork Simulation,https://catalog.example/teamwork,Collaboration with colleagues in a team,P
Leadership Report,https://catalog.example/leadership,Leadership potential and motivation,P
";

fn write_workspace(dir: &Path) -> Config {
    fs::write(dir.join("catalog.csv"), CATALOG).expect("should write catalog");
    fs::write(
        dir.join("config.toml"),
        r#"
[embedding]
provider = "hashing"
dimension = 1024

[catalog]
path = "catalog.csv"

[recommender]
default_top_k = 4

[logging]
trace_requests = true
"#,
    )
    .expect("should write config");

    Config::load(dir).expect("config should load")
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
fn config_directory_drives_the_engine() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_workspace(temp_dir.path());

    assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
    assert_eq!(config.catalog_path(), temp_dir.path().join("catalog.csv"));

    let engine = RecommendationEngine::from_config(&config).expect("engine should build");
    assert_eq!(engine.warm_up().expect("catalog should load"), 6);

    let results = engine
        .recommend("Java developer who works well in a team", 4, true)
        .expect("should recommend");

    assert_eq!(results.len(), 4);
    assert!(results[..2].iter().all(|r| r.category == "K"));
    assert!(results[2..].iter().all(|r| r.category == "P"));
    assert_eq!(results[0].assessment_name, "Core Java (Advanced Level)");
}

#[test]
fn unbalanced_results_follow_similarity() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_workspace(temp_dir.path());
    let engine = RecommendationEngine::from_config(&config).expect("engine should build");

    let results = engine
        .recommend("collaboration with colleagues in a team", 3, false)
        .expect("should recommend");

    assert_eq!(results[0].assessment_name, "Teamwork Simulation");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn missing_catalog_fails_only_when_used() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_workspace(temp_dir.path());
    fs::remove_file(config.catalog_path()).expect("should remove catalog");

    let engine = RecommendationEngine::from_config(&config).expect("engine builds lazily");
    assert!(engine.recommend("", 5, true).expect("blank query is fine").is_empty());
    assert!(engine.recommend("java", 5, true).is_err());
}

#[tokio::test]
async fn predictions_from_a_live_server_score_full_recall() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_workspace(temp_dir.path());

    let state = AppState::from_config(&config).expect("state should build");
    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have address");
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let test_csv = temp_dir.path().join("test.csv");
    let ground_truth = temp_dir.path().join("ground_truth.csv");
    let predictions = temp_dir.path().join("predictions.csv");
    fs::write(&test_csv, "Query\nJava developer\nTeam leadership\n").expect("should write");
    fs::write(
        &ground_truth,
        "Query,Assessment_url\n\
         Java developer,https://catalog.example/core-java\n\
         Team leadership,https://catalog.example/leadership\n\
         Team leadership,https://catalog.example/teamwork\n",
    )
    .expect("should write");

    let api_base = format!("http://{addr}");
    let (test_path, out_path) = (test_csv.clone(), predictions.clone());
    let summary = tokio::task::spawn_blocking(move || {
        generate_predictions(&test_path, &api_base, &out_path)
    })
    .await
    .expect("blocking task should join")
    .expect("predictions should be generated");

    // default_top_k = 4 from config.toml
    assert_eq!(summary.queries, 2);
    assert_eq!(summary.rows, 8);

    let recall = mean_recall_at_k(&ground_truth, &predictions, 10).expect("should evaluate");
    assert!((recall - 1.0).abs() < 1e-9, "recall was {recall}");

    let traces = fs::read_to_string(config.logs_dir().join("traces.jsonl"))
        .expect("requests should be traced");
    assert_eq!(traces.lines().count(), 2);

    server.abort();
}
