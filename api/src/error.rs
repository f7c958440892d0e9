use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use krishi_core::error::{self, ApiError};

use crate::llm::LlmError;
use crate::prediction::PredictionError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Language model or image classifier failed on a surface with no fallback (502)
    Upstream { message: String, docs_hint: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Upstream { message, docs_hint } => {
                tracing::warn!(request_id = %request_id, "Upstream failure: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError {
                        error: error::codes::UPSTREAM_UNAVAILABLE.to_string(),
                        message,
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: Some(docs_hint),
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Upstream {
            message: err.to_string(),
            docs_hint: "The assistant could not reach the language model. \
                        Retry later; disease advice keeps working through its fallback tiers."
                .to_string(),
        }
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        AppError::Upstream {
            message: err.to_string(),
            docs_hint: "The image classifier is unavailable. \
                        Retry later, or POST a known label to /v1/advice."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = AppError::Validation {
            message: "label must not be empty".to_string(),
            field: Some("label".to_string()),
            received: None,
            docs_hint: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn llm_failures_map_to_bad_gateway() {
        let response = AppError::from(LlmError::Timeout { elapsed_ms: 30_000 }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn classifier_failures_map_to_bad_gateway() {
        let response = AppError::from(PredictionError::Transport("connection refused".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
