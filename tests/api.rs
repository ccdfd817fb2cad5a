//! End-to-end tests driving the HTTP router against on-disk artifacts.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use sentiment_server::classifier::LogisticRegression;
use sentiment_server::engine::{Classifier, FeatureMatrix, FeatureTransformer};
use sentiment_server::loader::{self, ArtifactFiles, Artifacts, LocalDir};
use sentiment_server::server::{AppState, router};
use sentiment_server::service::PredictionService;
use sentiment_server::types::Sentiment;
use sentiment_server::vectorizer::VectorizerArtifact;

/// Unigram + bigram model where "love" leans positive and "hate" negative.
fn write_fixture(dir: &Path) {
    let vocabulary: HashMap<String, u32> = ["love", "hate", "this", "love this", "hate this"]
        .iter()
        .enumerate()
        .map(|(i, term)| (term.to_string(), i as u32))
        .collect();
    let file = File::create(dir.join("vectorizer.json")).unwrap();
    VectorizerArtifact::new(vocabulary, (1, 2))
        .write_to(file)
        .unwrap();

    LogisticRegression::new(vec![2.0, -2.0, 0.0, 0.5, -0.5], 0.0)
        .unwrap()
        .save(dir.join("classifier.safetensors"))
        .unwrap();
}

async fn app_for(dir: &Path) -> Router {
    let source = LocalDir {
        path: dir.to_path_buf(),
    };
    let artifacts = loader::load(&source, &ArtifactFiles::default()).await;
    router(AppState::new(Arc::new(PredictionService::new(artifacts))))
}

async fn loaded_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let app = app_for(dir.path()).await;
    (dir, app)
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn predicts_a_batch_in_order() {
    let (_dir, app) = loaded_app().await;

    let (status, body) = post_json(
        app,
        "/predict",
        json!({ "texts": ["I love this", "I hate this"] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "text": "I love this", "sentiment": 1 },
            { "text": "I hate this", "sentiment": 0 },
        ])
    );
}

#[tokio::test]
async fn repeated_requests_give_identical_labels() {
    let (_dir, app) = loaded_app().await;
    let body = json!({ "texts": ["hate it", "love it", "this", "LOVE THIS"] });

    let (_, first) = post_json(app.clone(), "/predict", body.clone()).await;
    let (_, second) = post_json(app, "/predict", body).await;
    assert_eq!(first, second);
    assert_eq!(first.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn concurrent_requests_are_isolated() {
    let (_dir, app) = loaded_app().await;

    let requests = (0..16).map(|i| {
        let text = if i % 2 == 0 { "love this" } else { "hate this" };
        post_json(app.clone(), "/predict", json!({ "texts": [text] }))
    });
    let responses = futures::future::join_all(requests).await;

    for (i, (status, body)) in responses.into_iter().enumerate() {
        assert_eq!(status, StatusCode::OK);
        let expected = if i % 2 == 0 { 1 } else { 0 };
        assert_eq!(body[0]["sentiment"], expected);
    }
}

#[tokio::test]
async fn empty_batch_is_a_bad_request() {
    let (_dir, app) = loaded_app().await;

    let (status, body) = post_json(app, "/predict", json!({ "texts": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn malformed_body_is_an_invalid_request() {
    let (_dir, app) = loaded_app().await;

    for body in [json!({ "text": "I love this" }), json!({ "texts": [null] })] {
        let (status, body) = post_json(app.clone(), "/predict", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "invalid_request");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"texts": "#))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::from(r#"{"texts": ["I love this"]}"#))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");
}

struct EmptyRows;

impl FeatureTransformer for EmptyRows {
    fn transform(&self, texts: &[String]) -> anyhow::Result<FeatureMatrix> {
        let mut matrix = FeatureMatrix::new(1);
        for _ in texts {
            matrix.push_row([])?;
        }
        Ok(matrix)
    }

    fn n_features(&self) -> usize {
        1
    }
}

struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn predict_batch(&self, _features: &FeatureMatrix) -> anyhow::Result<Vec<Sentiment>> {
        anyhow::bail!("boom")
    }
}

#[tokio::test]
async fn inference_failure_is_an_internal_error() {
    let artifacts = Artifacts::new(Arc::new(EmptyRows), Arc::new(BrokenClassifier));
    let app = router(AppState::new(Arc::new(PredictionService::new(Some(
        artifacts,
    )))));

    let (status, body) = post_json(app, "/predict", json!({ "texts": ["ok", "fine"] })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["kind"], "inference_failure");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("boom")
    );
}

#[tokio::test]
async fn missing_artifacts_answer_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_for(&dir.path().join("nowhere")).await;

    let (status, body) =
        post_json(app.clone(), "/predict", json!({ "texts": ["I love this"] })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "artifact_unavailable");

    let (status, body) = post_json(app.clone(), "/predict", json!({ "text": "x" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "artifact_unavailable");

    let (status, body) = get_json(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");

    let (status, body) = get_json(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models_loaded"], false);
}

#[tokio::test]
async fn corrupt_classifier_answers_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(dir.path().join("classifier.safetensors"), b"not a model").unwrap();
    let app = app_for(dir.path()).await;

    let (status, _) = post_json(app, "/predict", json!({ "texts": ["I love this"] })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_and_root_report_loaded_models() {
    let (_dir, app) = loaded_app().await;

    let (status, body) = get_json(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (_, body) = get_json(app, "/").await;
    assert_eq!(body["message"], "Sentiment Analysis API is running");
    assert_eq!(body["models_loaded"], true);
}
