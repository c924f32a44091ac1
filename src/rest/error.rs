use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ServiceError;

use super::models::ErrorResponse;

/// Where unknown pages are sent instead of a 404.
pub const FALLBACK_LOCATION: &str = "/redirect";

pub fn error_response(err: &ServiceError) -> Response {
    match err {
        ServiceError::InvalidInput(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                message: message.to_string(),
            }),
        )
            .into_response(),
        ServiceError::NotFound(_) => {
            (StatusCode::FOUND, [(header::LOCATION, FALLBACK_LOCATION)]).into_response()
        }
        ServiceError::StorageUnavailable { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                message: "storage unavailable".to_string(),
            }),
        )
            .into_response(),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_bad_request() {
        let response = error_response(&ServiceError::InvalidInput("page slug is required"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_redirects_to_fallback() {
        let response = error_response(&ServiceError::NotFound("nope".to_string()));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            FALLBACK_LOCATION
        );
    }

    #[test]
    fn storage_failure_is_server_error_without_redirect() {
        let response = error_response(&ServiceError::storage(
            "load page",
            anyhow::anyhow!("connection refused"),
        ));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::LOCATION).is_none());
    }
}
