use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use krishi_core::advice::DiseaseAdvice;
use krishi_core::error::ApiError;

use crate::error::AppError;
use crate::state::AppState;

const MAX_LABEL_LEN: usize = 200;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/advice", post(resolve_advice))
}

/// One classifier result, e.g. `{"label": "Tomato___Late_blight", "confidence": 0.91}`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct AdviceRequest {
    /// Raw class label from the image classifier
    pub label: String,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
}

fn validate_request(req: &AdviceRequest) -> Result<(), AppError> {
    let label = req.label.trim();
    if label.is_empty() {
        return Err(AppError::Validation {
            message: "label must not be empty".to_string(),
            field: Some("label".to_string()),
            received: Some(serde_json::json!(req.label)),
            docs_hint: Some("Pass the classifier's class name, e.g. Apple___Apple_scab.".to_string()),
        });
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(AppError::Validation {
            message: format!("label must be at most {MAX_LABEL_LEN} bytes"),
            field: Some("label".to_string()),
            received: None,
            docs_hint: None,
        });
    }
    if !req.confidence.is_finite() || !(0.0..=1.0).contains(&req.confidence) {
        return Err(AppError::Validation {
            message: "confidence must be a number between 0 and 1".to_string(),
            field: Some("confidence".to_string()),
            received: Some(serde_json::json!(req.confidence)),
            docs_hint: Some("Send the classifier probability, not a percentage.".to_string()),
        });
    }
    Ok(())
}

/// Resolve treatment advice for a classifier label.
///
/// Always succeeds once the request validates: when the language model is
/// unavailable the response comes from the knowledge table or the generic
/// template, flagged through `tier`, `degradation` and `errorMessage`.
#[utoipa::path(
    post,
    path = "/v1/advice",
    request_body = AdviceRequest,
    responses(
        (status = 200, description = "Disease advice", body = DiseaseAdvice),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 429, description = "Rate limited", body = ApiError)
    ),
    tag = "advice"
)]
pub async fn resolve_advice(
    State(state): State<AppState>,
    Json(req): Json<AdviceRequest>,
) -> Result<Json<DiseaseAdvice>, AppError> {
    validate_request(&req)?;
    let advice = state
        .advisor
        .resolve_advice(req.label.trim(), req.confidence)
        .await;
    Ok(Json(advice))
}
