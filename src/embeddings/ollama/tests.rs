use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, batch_size: u32) -> OllamaClient {
    let address = server.address();
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: address.ip().to_string(),
        port: address.port(),
        model: "test-model".to_string(),
        batch_size,
    };
    OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5))
        .with_retry_attempts(2)
        .with_backoff_unit(Duration::from_millis(1))
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model(), "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);
    assert_eq!(client.retry_attempts, 5);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1, "at least one attempt is always made");
}

#[tokio::test]
async fn embeddings_are_batched_and_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["alpha", "beta"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[3.0, 4.0], [0.0, 2.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["gamma"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
    let embeddings = tokio::task::spawn_blocking(move || client.embed(&texts))
        .await
        .expect("blocking task should join")
        .expect("embedding should succeed");

    assert_eq!(embeddings.len(), 3);
    assert!((embeddings[0][0] - 0.6).abs() < 1e-6);
    assert!((embeddings[0][1] - 0.8).abs() < 1e-6);
    assert_eq!(embeddings[1], vec![0.0, 1.0]);
    assert_eq!(embeddings[2], vec![1.0, 0.0]);
}

#[tokio::test]
async fn response_count_mismatch_is_an_embedding_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0]]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 8);
    let texts = vec!["one".to_string(), "two".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed(&texts))
        .await
        .expect("blocking task should join");

    assert!(matches!(result, Err(RecommenderError::Embedding(_))));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 8);
    let result = tokio::task::spawn_blocking(move || client.embed_one("query"))
        .await
        .expect("blocking task should join");

    assert!(result.is_err());
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 8);
    let result = tokio::task::spawn_blocking(move || client.embed_one("query"))
        .await
        .expect("blocking task should join");

    assert!(result.is_err());
}

#[tokio::test]
async fn health_check_probes_model_dimension() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "test-model", "size": 1024 }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 8);
    let other = OllamaClient {
        model: "missing-model".to_string(),
        ..client.clone()
    };

    let (ok, missing) =
        tokio::task::spawn_blocking(move || (client.health_check(), other.health_check()))
            .await
            .expect("blocking task should join");

    assert_eq!(ok.expect("configured model should be healthy"), 3);
    assert!(missing.is_err());
}

#[tokio::test]
async fn model_names_lists_installed_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "all-minilm:latest" }, { "name": "nomic-embed-text:latest" }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 8);
    let names = tokio::task::spawn_blocking(move || client.model_names())
        .await
        .expect("blocking task should join")
        .expect("models should be listed");

    assert_eq!(names, vec!["all-minilm:latest", "nomic-embed-text:latest"]);
}

#[test]
fn error_classification() {
    assert_eq!(classify(&ureq::Error::StatusCode(503)), Disposition::Retry);
    assert_eq!(classify(&ureq::Error::StatusCode(500)), Disposition::Retry);
    assert_eq!(classify(&ureq::Error::StatusCode(404)), Disposition::Fail);
    assert_eq!(classify(&ureq::Error::ConnectionFailed), Disposition::Retry);
    assert_eq!(classify(&ureq::Error::HostNotFound), Disposition::Retry);
}

#[test]
fn backoff_doubles() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_backoff_unit(Duration::from_millis(10));

    assert_eq!(client.backoff_delay(1), Duration::from_millis(10));
    assert_eq!(client.backoff_delay(2), Duration::from_millis(20));
    assert_eq!(client.backoff_delay(3), Duration::from_millis(40));
}

#[test]
fn empty_input_needs_no_request() {
    let client = OllamaClient::new(&OllamaConfig::default()).expect("Failed to create client");
    let embeddings = client.generate_embeddings(&[]).expect("nothing to embed");
    assert!(embeddings.is_empty());
}
