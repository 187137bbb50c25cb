//! API error type for the HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;
use wicara_conversation::StoreError;
use wicara_engine::EngineError;

/// Errors surfaced by the HTTP API.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed.
    BadRequest {
        /// What was wrong with it.
        reason: String,
    },
    /// Webhook verification failed.
    VerificationFailed,
    /// A store operation failed.
    Store(StoreError),
    /// An engine operation failed.
    Engine(EngineError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { reason } => write!(f, "bad request: {reason}"),
            Self::VerificationFailed => write!(f, "webhook verification failed"),
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::Engine(err) => write!(f, "engine error: {err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest { reason } => (StatusCode::BAD_REQUEST, reason.clone()),
            Self::VerificationFailed => {
                (StatusCode::FORBIDDEN, "verification failed".to_string())
            }
            Self::Store(_) | Self::Engine(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}
