use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tenantgate_core::DomainError;

/// Generic message for everything the caller may not tell apart.
const CONCEALED: &str = "not found or not authorized";

/// Handler error: a domain error rendered as `{ "error", "message" }`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        domain_error_to_response(self.0)
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        e if e.is_concealed() => json_error(StatusCode::NOT_FOUND, "not_found", CONCEALED),
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        // State and Storage: never leak details.
        other => {
            tracing::error!(error = %other, "request aborted on internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parses a path segment into a typed id (`400 invalid_id` on failure).
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(ApiError)
}
