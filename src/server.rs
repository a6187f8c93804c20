//! HTTP boundary: `POST /api/refine` and `GET /api/health`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{RefineError, TextRefiner};

#[derive(Clone)]
struct AppState {
    refiner: Arc<dyn TextRefiner>,
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineResponse {
    pub polished_text: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    refiner: &'static str,
}

/// Builds the API router around the refiner chosen at startup.
pub fn router(refiner: Arc<dyn TextRefiner>) -> Router {
    Router::new()
        .route("/api/refine", post(refine))
        .route("/api/health", get(health))
        .with_state(AppState { refiner })
}

async fn refine(
    State(state): State<AppState>,
    request: Result<Json<RefineRequest>, JsonRejection>,
) -> Result<Json<RefineResponse>, ApiError> {
    let Json(request) = request?;
    let text = request
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Input text cannot be empty"))?;

    let polished_text = state.refiner.refine_text(&text).await?;
    Ok(Json(RefineResponse { polished_text }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        refiner: state.refiner.name(),
    })
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<RefineError> for ApiError {
    fn from(err: RefineError) -> Self {
        match err {
            RefineError::InvalidInput(message) => Self::bad_request(message),
            other => {
                tracing::error!("refinement failed: {other}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: public_message(&other),
                }
            }
        }
    }
}

/// Client-facing summary; provider bodies and transport details stay in the logs.
fn public_message(err: &RefineError) -> String {
    match err {
        RefineError::Http { status, .. } => format!("AI API returned error: {status}"),
        RefineError::RetriesExhausted { attempts, .. } => match err.last_error() {
            RefineError::Http { status, .. } => {
                format!("AI API returned error after retries: {status}")
            }
            RefineError::Timeout { .. } => format!("AI API timed out after {attempts} attempts"),
            _ => format!("failed to reach AI API after {attempts} attempts"),
        },
        RefineError::Transport(_) => "failed to reach AI API".to_owned(),
        RefineError::Decode(_) => "invalid response from AI API".to_owned(),
        RefineError::Serialization(_) => "failed to serialize request".to_owned(),
        RefineError::InvalidInput(_)
        | RefineError::Timeout { .. }
        | RefineError::EmptyResponse(_)
        | RefineError::Interrupted
        | RefineError::Config(_) => err.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: format!("Error: {}", self.message),
            }),
        )
            .into_response()
    }
}
