use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::routes::AppState;
use crate::compose::GenerationRequest;
use crate::error::PrerollError;

#[derive(Serialize)]
pub struct GenerateResponse {
    pub output: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Default, Deserialize)]
pub struct AssistRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Error wrapper that renders `{"detail": ...}` with the mapped status.
pub struct ApiError(PrerollError);

impl From<PrerollError> for ApiError {
    fn from(err: PrerollError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            error!(status = %status, "request failed: {}", self.0);
        } else {
            warn!(status = %status, "request rejected: {}", self.0);
        }

        (status, Json(ErrorResponse { detail: self.0.to_string() })).into_response()
    }
}

// -- Health --------------------------------------------------------------

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// -- Generation ----------------------------------------------------------

/// Decode a JSON request body.  An empty body reads as `{}`, so it reaches
/// field validation instead of failing as malformed.
fn parse_body<T: DeserializeOwned + Default>(route: &str, body: &[u8]) -> Result<T, PrerollError> {
    if body.trim_ascii().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        debug!("{route}: unreadable body: {e}");
        PrerollError::InvalidBody
    })
}

pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request: GenerationRequest = parse_body("generate", &body)?;

    let prompt = state.composer.compose(&request)?;
    let output = state.gateway.generate(&prompt, &state.structured).await?;

    Ok(Json(GenerateResponse { output }))
}

pub async fn assist(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request: AssistRequest = parse_body("assist", &body)?;

    let prompt = state.composer.compose_assist(request.prompt.as_deref())?;
    let output = state.gateway.generate(&prompt, &state.assist).await?;

    Ok(Json(GenerateResponse { output }))
}
