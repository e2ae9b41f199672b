use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use ta_answer::{AnswerResponse, LanguageModelClient, Pipeline, PipelineError, QuestionRequest, TextExtractor};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState<L, O> {
    pub pipeline: Arc<Pipeline<L, O>>,
}

impl<L, O> Clone for AppState<L, O> {
    fn clone(&self) -> Self {
        Self { pipeline: Arc::clone(&self.pipeline) }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub documents: usize,
}

/// Error body returned to clients. Never carries internal error detail.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Validation(message) => ApiError::new(StatusCode::BAD_REQUEST, message),
            PipelineError::Retrieval(e) => {
                tracing::error!(error = %e, "retrieval failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            PipelineError::Timeout { after } => {
                tracing::error!(?after, "answer timed out");
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, "The language model did not respond in time")
            }
            PipelineError::Unavailable(e) => {
                tracing::error!(error = %e, "language model unavailable");
                ApiError::new(StatusCode::BAD_GATEWAY, "The language model service is unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub fn build_app<L, O>(pipeline: Arc<Pipeline<L, O>>) -> Router
where
    L: LanguageModelClient + 'static,
    O: TextExtractor + 'static,
{
    let app_state = AppState { pipeline };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(health_handler::<L, O>))
        .route("/api", post(answer_handler::<L, O>))
        .route("/api/", post(answer_handler::<L, O>))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn answer_handler<L, O>(
    State(state): State<AppState<L, O>>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError>
where
    L: LanguageModelClient,
    O: TextExtractor,
{
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected request body");
        ApiError::new(StatusCode::BAD_REQUEST, "Request body must be JSON with a \"question\" field")
    })?;
    let response = state.pipeline.answer(&request).await?;
    Ok(Json(response))
}

pub async fn health_handler<L, O>(State(state): State<AppState<L, O>>) -> Json<HealthResponse>
where
    L: LanguageModelClient,
    O: TextExtractor,
{
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    Json(HealthResponse {
        status: "healthy",
        timestamp,
        documents: state.pipeline.index().len(),
    })
}
