use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Error raised by a [`crate::store::SessionStore`] implementation or by the
/// typed adapter on top of it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Backend(String),
    #[error("corrupt value at key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Core signaling error taxonomy. Every failure a client can cause maps to
/// one of these; anything unexpected surfaces as `INTERNAL_SIGNALING_ERROR`
/// so a routing failure never tears the connection down.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("no registered session for user {0}")]
    SessionNotFound(i64),
    #[error("signaling requires an authenticated identity")]
    Unauthorized,
    #[error("{0}")]
    ValidationFailed(String),
    #[error("user {0} has no live session")]
    TargetOffline(i64),
    #[error("internal signaling error: {0}")]
    Internal(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SignalError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            SignalError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            SignalError::Unauthorized => "UNAUTHORIZED",
            SignalError::ValidationFailed(_) => "VALIDATION_FAILED",
            SignalError::TargetOffline(_) => "TARGET_OFFLINE",
            SignalError::Internal(_) | SignalError::Store(_) => "INTERNAL_SIGNALING_ERROR",
        }
    }

    /// True for errors whose details must not leak to the client.
    pub fn is_internal(&self) -> bool {
        matches!(self, SignalError::Internal(_) | SignalError::Store(_))
    }
}

/// Structured API error returned to REST clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

/// Application-level error type that converts into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(%err, "session store error");
        Self::internal("An internal error occurred")
    }
}
