use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use krishi_core::error::ApiError;
use krishi_core::sensors::SensorReadings;

use crate::error::AppError;
use crate::llm::ChatMessage;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 4000;
const MAX_HISTORY: usize = 40;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/chat", post(chat))
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    /// Earlier turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub message: String,
    /// Current field readings to ground the answer
    #[serde(default)]
    pub sensors: Option<SensorReadings>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub reply: String,
    pub created_at: DateTime<Utc>,
}

fn validate_request(req: &ChatRequest) -> Result<(), AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation {
            message: "message must not be empty".to_string(),
            field: Some("message".to_string()),
            received: Some(serde_json::json!(req.message)),
            docs_hint: None,
        });
    }
    if req.message.len() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation {
            message: format!("message must be at most {MAX_MESSAGE_LEN} bytes"),
            field: Some("message".to_string()),
            received: None,
            docs_hint: None,
        });
    }
    if req.history.len() > MAX_HISTORY {
        return Err(AppError::Validation {
            message: format!("history must contain at most {MAX_HISTORY} messages"),
            field: Some("history".to_string()),
            received: Some(serde_json::json!(req.history.len())),
            docs_hint: Some("Send only the most recent turns of the conversation.".to_string()),
        });
    }
    Ok(())
}

/// Ask the farm assistant a question. Unlike disease advice there is no
/// fallback: a model failure is reported as 502.
#[utoipa::path(
    post,
    path = "/v1/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 429, description = "Rate limited", body = ApiError),
        (status = 502, description = "Language model unavailable", body = ApiError)
    ),
    tag = "assistant"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate_request(&req)?;
    let reply = state
        .assistant
        .reply(&req.history, &req.message, req.sensors.as_ref())
        .await?;
    Ok(Json(ChatResponse {
        reply,
        created_at: Utc::now(),
    }))
}
