//! API routes for fleetd

use crate::handlers;
use crate::server::{AppState, MAX_BODY_SIZE};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fleet_common::{FieldIssue, GenerateResponse, ReportError, SchemaValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

type AppStateArc = Arc<AppState>;

/// JSON body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldIssue>,
}

/// Handler error rendered as a status code plus `ErrorBody`
#[derive(Debug)]
pub struct ApiError(pub ReportError);

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let fields = match &self.0 {
            ReportError::SchemaValidation(e) => e.issues.clone(),
            _ => Vec::new(),
        };
        if !self.0.is_client_error() {
            error!("Request failed ({}): {}", self.0.kind(), self.0);
        }
        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Report Routes
// ============================================================================

pub fn report_routes() -> Router<AppStateArc> {
    Router::new().route("/generate", post(generate_report))
}

async fn generate_report(
    State(state): State<AppStateArc>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let body = body.map_err(body_rejection)?;
    let span = info_span!("generate", request_id = %Uuid::new_v4());

    let response = tokio::time::timeout(
        state.request_timeout,
        handlers::handle_generate(&state, &body).instrument(span),
    )
    .await
    .map_err(|_| {
        ReportError::CompletionService(format!(
            "report not generated within {} ms",
            state.request_timeout.as_millis()
        ))
    })??;
    Ok(Json(response))
}

fn body_rejection(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError(ReportError::PayloadTooLarge(MAX_BODY_SIZE));
    }
    ApiError(ReportError::SchemaValidation(SchemaValidationError {
        issues: vec![FieldIssue {
            path: "$".to_string(),
            expected: "readable request body".to_string(),
            found: rejection.body_text(),
        }],
    }))
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub mode: String,
    pub model: String,
    pub uptime_seconds: u64,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: state.config.mode.to_string(),
        model: state.config.model.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
