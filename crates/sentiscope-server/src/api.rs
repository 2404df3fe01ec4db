//! HTTP handlers for the sentiment service.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | Liveness, backend name, current run state |
//! | `POST /v1/distribution` | Resolve a comment set and return its distribution |
//! | `GET /v1/distribution/latest` | Last committed distribution |
//! | `GET /v1/status` | Current run state |

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use sentiscope_core::{
    Comment, Distribution, Generation, Percentages, ResolvedSentiment, RunId, RunReport,
    SentimentError,
};
use sentiscope_engine::SentimentEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// Shared application state.
pub struct AppState {
    pub engine: Arc<SentimentEngine>,
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /v1/distribution`.
#[derive(Debug, Deserialize)]
pub struct DistributionRequest {
    pub comments: Vec<Comment>,
    /// Also return the per-comment labels, in input order.
    #[serde(default)]
    pub include_labels: bool,
}

/// Query parameters for `GET /v1/distribution/latest`.
#[derive(Debug, Default, Deserialize)]
pub struct LatestParams {
    #[serde(default)]
    pub include_labels: bool,
}

/// A committed distribution as served to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct DistributionResponse {
    pub run_id: RunId,
    pub generation: Generation,
    pub distribution: Distribution,
    pub percentages: Percentages,
    /// Comments whose resolution failed unexpectedly (counted as neutral).
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<ResolvedSentiment>>,
}

impl DistributionResponse {
    fn from_report(report: &RunReport, include_labels: bool) -> Self {
        Self {
            run_id: report.run_id,
            generation: report.generation,
            distribution: report.distribution.clone(),
            percentages: report.distribution.percentages(),
            failed: report.failed,
            labels: include_labels.then(|| report.resolved.clone()),
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Serialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: &'static str,
}

/// Build a JSON error response.
fn api_error(status: StatusCode, error_type: &'static str, message: &str) -> Response {
    let body = ApiError {
        error: ApiErrorDetail {
            message: message.to_string(),
            error_type,
        },
    };
    (status, Json(body)).into_response()
}

/// Map an engine error onto an HTTP error response.
fn engine_error(e: &SentimentError) -> Response {
    match e {
        SentimentError::Superseded { .. } => {
            api_error(StatusCode::CONFLICT, "superseded", &e.to_string())
        }
        SentimentError::Pipeline(_) => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", &e.to_string())
        }
        SentimentError::Config(_) | SentimentError::Serialization(_) => {
            error!(error = %e, "Sentiment run failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", &e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let body = serde_json::json!({
        "status": "healthy",
        "backend": state.engine.backend_name(),
        "state": state.engine.state(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// `POST /v1/distribution`
pub async fn distribution_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DistributionRequest>,
) -> Response {
    match state.engine.compute_distribution(&request.comments).await {
        Ok(report) => {
            Json(DistributionResponse::from_report(&report, request.include_labels)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Distribution request did not commit");
            engine_error(&e)
        }
    }
}

/// `GET /v1/distribution/latest`
pub async fn latest_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestParams>,
) -> Response {
    match state.engine.latest() {
        Some(report) => {
            Json(DistributionResponse::from_report(&report, params.include_labels)).into_response()
        }
        None => api_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "No distribution has been computed yet",
        ),
    }
}

/// `GET /v1/status`
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.engine.state()).into_response()
}

/// Build the service router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/distribution", post(distribution_handler))
        .route("/v1/distribution/latest", get(latest_handler))
        .route("/v1/status", get(status_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sentiscope_core::{
        EngineConfig, InferenceBackend, InferenceOutput, InferenceRequest, InferenceResult,
        LabelScore, SentimentLabel,
    };
    use tower::ServiceExt;

    /// Positive when the text mentions "good", negative otherwise.
    struct KeywordBackend;

    #[async_trait::async_trait]
    impl InferenceBackend for KeywordBackend {
        async fn call(&self, request: &InferenceRequest) -> InferenceResult {
            match request {
                InferenceRequest::ClassifyText { text } if text.contains("good") => Ok(
                    InferenceOutput::Labels(vec![LabelScore::new("POSITIVE", 0.9)]),
                ),
                _ => Ok(InferenceOutput::Labels(vec![LabelScore::new(
                    "NEGATIVE", 0.9,
                )])),
            }
        }

        fn name(&self) -> &'static str {
            "KeywordBackend"
        }
    }

    fn test_app() -> (Router, Arc<SentimentEngine>) {
        let mut config = EngineConfig::default().with_api_token("t");
        config.language.enabled = false;
        config.image.enabled = false;
        config.batch.cooldown_ms = 0;
        let engine = Arc::new(SentimentEngine::with_backend(
            &config,
            Arc::new(KeywordBackend),
        ));
        let state = Arc::new(AppState {
            engine: Arc::clone(&engine),
        });
        (build_router(state), engine)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = test_app();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["backend"], "KeywordBackend");
        assert_eq!(json["state"]["state"], "idle");
    }

    #[tokio::test]
    async fn test_distribution_endpoint() {
        let (app, _) = test_app();
        let req = post_json(
            "/v1/distribution",
            serde_json::json!({
                "comments": [
                    { "text": "good stuff" },
                    { "text": "nope" },
                    { "description": "good again", "imageUrl": "https://img/1.png" },
                    {}
                ]
            }),
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["distribution"]["total"], 4);
        assert_eq!(json["distribution"]["counts"]["positive"], 2);
        assert_eq!(json["distribution"]["counts"]["negative"], 1);
        assert_eq!(json["distribution"]["counts"]["neutral"], 1);
        assert_eq!(json["percentages"]["positive"], 50.0);
        assert_eq!(json["failed"], 0);
        assert!(json.get("labels").is_none());
    }

    #[tokio::test]
    async fn test_distribution_with_labels() {
        let (app, _) = test_app();
        let req = post_json(
            "/v1/distribution",
            serde_json::json!({
                "comments": [{ "text": "good" }, { "text": "bad" }],
                "include_labels": true
            }),
        );
        let resp = app.oneshot(req).await.unwrap();
        let json = body_json(resp).await;

        let labels: Vec<ResolvedSentiment> =
            serde_json::from_value(json["labels"].clone()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].fused_label, SentimentLabel::Positive);
        assert_eq!(labels[1].fused_label, SentimentLabel::Negative);
    }

    #[tokio::test]
    async fn test_latest_is_404_before_any_run() {
        let (app, _) = test_app();
        let req = Request::builder()
            .uri("/v1/distribution/latest")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_latest_returns_committed_run() {
        let (app, engine) = test_app();
        let report = engine
            .compute_distribution(&[Comment::text("good")])
            .await
            .unwrap();

        let req = Request::builder()
            .uri("/v1/distribution/latest?include_labels=true")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let parsed: DistributionResponse = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.generation, report.generation);
        assert_eq!(parsed.labels.map(|l| l.len()), Some(1));
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (app, _) = test_app();
        let req = Request::builder()
            .uri("/v1/status")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(body_json(resp).await["state"], "idle");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let (app, _) = test_app();
        let req = post_json("/v1/distribution", serde_json::json!({ "comment": [] }));
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_shutdown_engine_answers_503() {
        let (app, engine) = test_app();
        engine.shutdown();
        let req = post_json(
            "/v1/distribution",
            serde_json::json!({ "comments": [{ "text": "good" }] }),
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_superseded_maps_to_conflict() {
        let resp = engine_error(&SentimentError::Superseded {
            generation: Generation {
                sequence: 1,
                fingerprint: 7,
            },
        });
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
