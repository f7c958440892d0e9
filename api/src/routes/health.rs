use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Whether disease advice can use the live model or only the fallback tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorMode {
    Configured,
    FallbackOnly,
}

/// Whether image diagnoses can reach a prediction backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    Configured,
    Unconfigured,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub advisor: AdvisorMode,
    pub classifier: ClassifierMode,
}

/// Health check endpoint. A missing model key still reports `ok`; advice then
/// comes from the fallback tiers.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let advisor = if state.advisor.is_configured() {
        AdvisorMode::Configured
    } else {
        AdvisorMode::FallbackOnly
    };
    let classifier = if state.classifier.is_configured() {
        ClassifierMode::Configured
    } else {
        ClassifierMode::Unconfigured
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        advisor,
        classifier,
    })
}
