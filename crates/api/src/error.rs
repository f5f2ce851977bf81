use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lpms_core::error::{CoreError, ErrorKind};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `lpms_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A resource addressed by something other than a record id is missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const HIDDEN_MESSAGE: &str = "An internal error occurred";

/// HTTP status and stable error code for a domain error kind.
pub fn kind_status(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::InvalidTransition => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
        ErrorKind::WindowClosed => (StatusCode::FORBIDDEN, "WINDOW_CLOSED"),
        ErrorKind::InvalidWindowConfig => (StatusCode::BAD_REQUEST, "INVALID_WINDOW_CONFIG"),
        ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
        ErrorKind::ObjectStore => (StatusCode::BAD_GATEWAY, "OBJECT_STORE_ERROR"),
        ErrorKind::Persistence => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
        ErrorKind::Unmarshal => (StatusCode::INTERNAL_SERVER_ERROR, "UNMARSHAL_ERROR"),
        ErrorKind::UnknownActor => (StatusCode::FORBIDDEN, "UNKNOWN_ACTOR"),
        ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
    }
}

/// The client-facing message for a domain error. Server-side failures are
/// logged and replaced by a generic message.
fn core_message(err: &CoreError) -> String {
    match err {
        CoreError::NotFound { entity, id } => format!("{entity} with id {id} not found"),
        CoreError::BulkAborted { source, .. } => core_message(source),
        CoreError::Persistence(_) | CoreError::Unmarshal(_) => {
            tracing::error!(error = %err, "Internal core error");
            HIDDEN_MESSAGE.to_string()
        }
        CoreError::ObjectStore { .. } => {
            tracing::error!(error = %err, "Object store failure");
            err.to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Core(core) => {
                let (status, code) = kind_status(core.kind());
                let message = core_message(core);
                let body = match core {
                    CoreError::BulkAborted {
                        failed_id,
                        completed,
                        ..
                    } => json!({
                        "error": message,
                        "code": code,
                        "failed_id": failed_id,
                        "completed": completed,
                    }),
                    _ => json!({ "error": message, "code": code }),
                };
                (status, body)
            }

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "error": msg, "code": "NOT_FOUND" }),
            ),

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "code": "BAD_REQUEST" }),
            ),

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": HIDDEN_MESSAGE, "code": "INTERNAL_ERROR" }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
