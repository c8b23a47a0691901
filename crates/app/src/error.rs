use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use issue_desk_core::ValidationError;
use issue_desk_storage::IssueStoreError;

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned by the issue handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl ApiError {
    /// Maps a store failure, logging the cause of anything that is not a miss.
    pub fn from_store(operation: &'static str, err: IssueStoreError) -> Self {
        match err {
            IssueStoreError::NotFound(_) => Self::NotFound("issue not found".to_string()),
            other => {
                error!(stage = "http", operation, error = %other, "issue store failure");
                Self::Internal
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(message) | Self::NotFound(message) => message,
            Self::Internal => INTERNAL_MESSAGE.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_miss_maps_to_not_found() {
        let err = ApiError::from_store("get", IssueStoreError::NotFound(9));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(matches!(err, ApiError::NotFound(message) if message == "issue not found"));
    }

    #[test]
    fn store_failure_hides_details() {
        let err = ApiError::from_store("list", IssueStoreError::Corrupt("bad row".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, ApiError::Internal));
    }

    #[test]
    fn validation_error_is_bad_request_with_message() {
        let err = ApiError::from(ValidationError::MissingField("fullName"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, ApiError::BadRequest(message) if message == "fullName is required"));
    }
}
