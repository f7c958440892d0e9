use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};

use krishi_core::advice::DiseaseAdvice;
use krishi_core::error::ApiError;

use crate::error::AppError;
use crate::state::AppState;

/// Largest accepted base64 payload (about 6 MiB of image data).
const MAX_IMAGE_LEN: usize = 8 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/diagnoses", post(diagnose))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_LEN + 1024))
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct DiagnosisRequest {
    /// Base64-encoded leaf photo; a `data:image/...;base64,` prefix is allowed
    pub image: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResponse {
    /// Raw classifier label
    pub class_name: String,
    /// Classifier probability in [0, 1]
    pub probability: f64,
    pub advice: DiseaseAdvice,
}

/// Base64 body of an image string, without any data-URL prefix.
fn image_payload(image: &str) -> &str {
    match image.split_once(',') {
        Some((_, payload)) => payload.trim(),
        None => image.trim(),
    }
}

fn validate_image(image: &str) -> Result<(), AppError> {
    let payload = image_payload(image);
    if payload.is_empty() {
        return Err(AppError::Validation {
            message: "image must not be empty".to_string(),
            field: Some("image".to_string()),
            received: None,
            docs_hint: Some("Send the photo as a base64 string.".to_string()),
        });
    }
    if payload.len() > MAX_IMAGE_LEN {
        return Err(AppError::Validation {
            message: format!("image must be at most {MAX_IMAGE_LEN} base64 characters"),
            field: Some("image".to_string()),
            received: None,
            docs_hint: Some("Resize the photo before uploading.".to_string()),
        });
    }
    if let Err(err) = base64::engine::general_purpose::STANDARD.decode(payload) {
        return Err(AppError::Validation {
            message: format!("image is not valid base64: {err}"),
            field: Some("image".to_string()),
            received: None,
            docs_hint: Some("Use standard base64 with padding.".to_string()),
        });
    }
    Ok(())
}

/// Classify a leaf photo and resolve treatment advice for the result.
///
/// Fails with 502 when the classifier is unreachable; once a label is known the
/// advice itself always resolves, degrading like `/v1/advice`.
#[utoipa::path(
    post,
    path = "/v1/diagnoses",
    request_body = DiagnosisRequest,
    responses(
        (status = 200, description = "Classifier result with advice", body = DiagnosisResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 429, description = "Rate limited", body = ApiError),
        (status = 502, description = "Image classifier unavailable", body = ApiError)
    ),
    tag = "advice"
)]
pub async fn diagnose(
    State(state): State<AppState>,
    Json(req): Json<DiagnosisRequest>,
) -> Result<Json<DiagnosisResponse>, AppError> {
    validate_image(&req.image)?;

    let prediction = state.classifier.predict(&req.image).await?;
    tracing::info!(
        class_name = %prediction.class_name,
        probability = prediction.probability,
        "Image classified"
    );

    let advice = state
        .advisor
        .resolve_advice(prediction.class_name.trim(), prediction.probability)
        .await;

    Ok(Json(DiagnosisResponse {
        class_name: prediction.class_name,
        probability: prediction.probability,
        advice,
    }))
}
