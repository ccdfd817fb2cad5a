//! HTTP transport over the prediction service.

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use metrics::counter;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::{ErrorKind, PredictionError};
use crate::service::PredictionService;
use crate::types::{PredictRequest, SentimentResult};

#[derive(Clone)]
pub struct AppState {
    service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "Sentiment Analysis API is running",
        "models_loaded": state.service.is_ready(),
    }))
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.service.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}

#[tracing::instrument(
    skip(state, request),
    fields(request_id = %uuid::Uuid::new_v4().simple(), input_count = tracing::field::Empty)
)]
async fn predict_handler(
    State(state): State<AppState>,
    request: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Vec<SentimentResult>>, PredictionError> {
    counter!("sentiment_requests_total").increment(1);

    if !state.service.is_ready() {
        return Err(PredictionError::ArtifactUnavailable);
    }
    let Json(request) =
        request.map_err(|rejection| PredictionError::invalid_request(rejection.body_text()))?;
    tracing::Span::current().record("input_count", request.texts.len());

    let service = state.service.clone();
    let span = tracing::Span::current();
    let results = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        service.predict(&request.texts)
    })
    .await
    .map_err(|e| PredictionError::inference(anyhow::anyhow!("prediction task failed: {e}")))??;

    tracing::info!(result_count = results.len(), "Prediction completed");
    Ok(Json(results))
}

impl IntoResponse for PredictionError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::ArtifactUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::InferenceFailure => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({
            "error": {
                "kind": kind,
                "message": self.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}
