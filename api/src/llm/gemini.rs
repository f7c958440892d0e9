use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatRole, GenerativeClient, LlmError};
use crate::config::LlmConfig;

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_k: 32,
            top_p: 0.95,
            max_output_tokens: 800,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    /// Fails with [`LlmError::Configuration`] when no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::Configuration("GEMINI_API_KEY is not set".to_string()))?
            .to_string();

        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
            model: config.model.clone(),
            generation: GenerationConfig::default(),
        })
    }
}

fn gemini_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

fn build_request<'a>(
    prompt: &'a str,
    history: &'a [ChatMessage],
    generation: GenerationConfig,
) -> GenerateContentRequest<'a> {
    let mut contents: Vec<Content<'a>> = history
        .iter()
        .map(|message| Content {
            role: gemini_role(message.role),
            parts: vec![RequestPart {
                text: &message.content,
            }],
        })
        .collect();
    contents.push(Content {
        role: "user",
        parts: vec![RequestPart { text: prompt }],
    });

    GenerateContentRequest {
        contents,
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: BLOCK_THRESHOLD,
            })
            .collect(),
        generation_config: generation,
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(LlmError::Transport(format!("prompt blocked: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
            return Err(LlmError::Transport(format!(
                "generation stopped early: {reason}"
            )));
        }
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, LlmError> {
        let request = build_request(prompt, history, self.generation);
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                model = %self.model,
                status = %status,
                "Gemini request returned non-success status"
            );
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        extract_text(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).expect("response fixture should deserialize")
    }

    #[test]
    fn new_requires_api_key() {
        assert!(matches!(
            GeminiClient::new(&config(None)),
            Err(LlmError::Configuration(_))
        ));
        assert!(matches!(
            GeminiClient::new(&config(Some("  "))),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn new_builds_model_endpoint() {
        let client = GeminiClient::new(&config(Some("key"))).expect("client should build");
        assert_eq!(
            client.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(client.model_name(), "gemini-1.5-flash");
    }

    #[test]
    fn request_maps_history_roles_and_appends_prompt() {
        let history = vec![
            ChatMessage {
                role: ChatRole::User,
                content: "When should I sow wheat?".to_string(),
            },
            ChatMessage {
                role: ChatRole::Assistant,
                content: "Late October to November.".to_string(),
            },
        ];
        let request = build_request("And rice?", &history, GenerationConfig::default());
        let value = serde_json::to_value(&request).expect("request should serialize");

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][2]["parts"][0]["text"], "And rice?");
        assert_eq!(value["safetySettings"].as_array().map(Vec::len), Some(4));
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 800);
        assert_eq!(value["generationConfig"]["topK"], 32);
    }

    #[test]
    fn extract_text_joins_parts_of_first_candidate() {
        let text = extract_text(response(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        })))
        .expect("text should be extracted");
        assert_eq!(text, "{\"a\":1}");
    }

    #[test]
    fn extract_text_reports_blocked_prompt() {
        let err = extract_text(response(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .expect_err("blocked prompt must fail");
        assert!(matches!(err, LlmError::Transport(_)));
    }

    #[test]
    fn extract_text_without_candidates_is_empty() {
        let err = extract_text(response(json!({"candidates": []})))
            .expect_err("no candidates must fail");
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[test]
    fn error_message_prefers_api_error_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_REQUEST, body),
            "API key not valid"
        );
        assert_eq!(
            error_message(reqwest::StatusCode::SERVICE_UNAVAILABLE, "<html>"),
            "Service Unavailable"
        );
    }
}
