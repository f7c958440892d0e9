use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use krishi_core::error::ApiError;

use crate::assistant::{CropRecommendations, FieldConditions};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/crops/recommendations", post(recommend_crops))
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CropRecommendationRequest {
    pub soil_type: String,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub region: String,
}

fn validate_request(req: &CropRecommendationRequest) -> Result<FieldConditions, AppError> {
    for (field, value) in [("soilType", &req.soil_type), ("region", &req.region)] {
        if value.trim().is_empty() {
            return Err(AppError::Validation {
                message: format!("{field} must not be empty"),
                field: Some(field.to_string()),
                received: Some(serde_json::json!(value)),
                docs_hint: None,
            });
        }
    }
    for (field, value) in [
        ("temperature", req.temperature),
        ("humidity", req.humidity),
        ("soilMoisture", req.soil_moisture),
    ] {
        if !value.is_finite() {
            return Err(AppError::Validation {
                message: format!("{field} must be a finite number"),
                field: Some(field.to_string()),
                received: None,
                docs_hint: None,
            });
        }
    }
    Ok(FieldConditions {
        soil_type: req.soil_type.trim().to_string(),
        temperature: req.temperature,
        humidity: req.humidity,
        soil_moisture: req.soil_moisture,
        region: req.region.trim().to_string(),
    })
}

/// Suggest crops for the field. Falls back to a default list (`source: "default"`).
#[utoipa::path(
    post,
    path = "/v1/crops/recommendations",
    request_body = CropRecommendationRequest,
    responses(
        (status = 200, description = "Recommended crops", body = CropRecommendations),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 429, description = "Rate limited", body = ApiError)
    ),
    tag = "assistant"
)]
pub async fn recommend_crops(
    State(state): State<AppState>,
    Json(req): Json<CropRecommendationRequest>,
) -> Result<Json<CropRecommendations>, AppError> {
    let conditions = validate_request(&req)?;
    Ok(Json(state.assistant.recommend_crops(&conditions).await))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn validate_request_rejects_blank_region() {
        let err = validate_request(&CropRecommendationRequest {
            soil_type: "Clay".to_string(),
            temperature: 25.0,
            humidity: 60.0,
            soil_moisture: 40.0,
            region: " ".to_string(),
        })
        .expect_err("blank region must fail");
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("region")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_model_returns_default_crops() {
        let app = router().with_state(AppState::fallback_only());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/crops/recommendations")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "soilType": "Loamy",
                            "temperature": 26.0,
                            "humidity": 55.0,
                            "soilMoisture": 38.0,
                            "region": "Maharashtra"
                        })
                        .to_string(),
                    ))
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("body should be JSON");
        assert_eq!(body["source"], "default");
        assert_eq!(
            body["crops"],
            serde_json::json!(["Wheat", "Corn", "Soybeans", "Tomatoes", "Potatoes"])
        );
    }
}
