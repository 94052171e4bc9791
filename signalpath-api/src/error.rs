//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use signalpath::request::ValidationError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task not found")]
    TaskNotFound,

    #[error("artifact not available")]
    ArtifactNotAvailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TaskNotFound | ApiError::ArtifactNotAvailable => StatusCode::NOT_FOUND,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_unprocessable_entity() {
        let err = ApiError::Validation(ValidationError {
            field: "tx_lat",
            reason: "out of range".to_string(),
        });
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn missing_task_maps_to_not_found() {
        assert_eq!(
            ApiError::TaskNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
