use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use krishi_core::error::ApiError;
use krishi_core::sensors::{ChannelFeedEntry, SensorAssessment, SensorReadings, assess};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sensors/assessment", post(assess_readings))
        .route("/v1/sensors/feed/assessment", post(assess_feed_entry))
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorAssessmentRequest {
    #[serde(flatten)]
    pub readings: SensorReadings,
    /// Crop grown in the field; enables the water-requirement estimate
    #[serde(default)]
    pub crop: Option<String>,
}

/// Same as [`SensorAssessmentRequest`] but with the raw telemetry feed entry.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct FeedAssessmentRequest {
    pub entry: ChannelFeedEntry,
    #[serde(default)]
    pub crop: Option<String>,
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), AppError> {
    if value.is_finite() && (min..=max).contains(&value) {
        return Ok(());
    }
    Err(AppError::Validation {
        message: format!("{field} must be between {min} and {max}"),
        field: Some(field.to_string()),
        received: Some(serde_json::json!(value)),
        docs_hint: None,
    })
}

fn validate_readings(readings: &SensorReadings) -> Result<(), AppError> {
    check_range("temperature", readings.temperature, -60.0, 70.0)?;
    check_range("humidity", readings.humidity, 0.0, 100.0)?;
    check_range("soilMoisture", readings.soil_moisture, 0.0, 100.0)?;
    if let Some(ph) = readings.soil_ph {
        check_range("soilPh", ph, 0.0, 14.0)?;
    }
    for (field, value) in [
        ("light", readings.light),
        ("rainfall", readings.rainfall),
        ("windSpeed", readings.wind_speed),
    ] {
        if let Some(value) = value {
            check_range(field, value, 0.0, f64::MAX)?;
        }
    }
    Ok(())
}

/// Threshold statuses, system status, pest risk and (with a crop) irrigation need.
#[utoipa::path(
    post,
    path = "/v1/sensors/assessment",
    request_body = SensorAssessmentRequest,
    responses(
        (status = 200, description = "Assessment of the readings", body = SensorAssessment),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "sensors"
)]
pub async fn assess_readings(
    Json(req): Json<SensorAssessmentRequest>,
) -> Result<Json<SensorAssessment>, AppError> {
    validate_readings(&req.readings)?;
    Ok(Json(assess(req.readings, req.crop.as_deref())))
}

/// Assess the latest ThingSpeak channel entry (string-typed `fieldN` values).
#[utoipa::path(
    post,
    path = "/v1/sensors/feed/assessment",
    request_body = FeedAssessmentRequest,
    responses(
        (status = 200, description = "Assessment of the parsed readings", body = SensorAssessment),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "sensors"
)]
pub async fn assess_feed_entry(
    Json(req): Json<FeedAssessmentRequest>,
) -> Result<Json<SensorAssessment>, AppError> {
    let readings = req.entry.readings();
    tracing::debug!(
        entry_id = ?req.entry.entry_id,
        created_at = %req.entry.created_at,
        "Assessing telemetry feed entry"
    );
    validate_readings(&readings)?;
    Ok(Json(assess(readings, req.crop.as_deref())))
}
