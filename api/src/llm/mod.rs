//! Generative-language access.
//!
//! `GenerativeClient` is the seam between the service and the hosted model;
//! `LanguageModel` wraps an optional client with the per-call time budget so
//! every caller gets the same timeout and empty-response handling.

pub mod gemini;
pub mod recovery;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use krishi_core::advice::DegradationReason;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model client is not configured: {0}")]
    Configuration(String),
    #[error("language model request failed: {0}")]
    Transport(String),
    #[error("language model returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("language model request timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u128 },
    #[error("empty response from language model")]
    EmptyResponse,
    #[error("language model response could not be parsed: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    pub fn degradation_reason(&self) -> DegradationReason {
        match self {
            LlmError::Configuration(_) => DegradationReason::Configuration,
            LlmError::Transport(_) | LlmError::Status { .. } => DegradationReason::Transport,
            LlmError::Timeout { .. } => DegradationReason::Timeout,
            LlmError::EmptyResponse | LlmError::MalformedResponse(_) => {
                DegradationReason::MalformedResponse
            }
        }
    }
}

/// A hosted text-generation model.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send `prompt` as the newest user turn after `history`; return the model's text.
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, LlmError>;

    /// Model identifier, for logs and responses.
    fn model_name(&self) -> &str;
}

#[derive(Clone)]
enum ClientSlot {
    Ready(Arc<dyn GenerativeClient>),
    Unavailable(String),
}

/// Shared handle to the language model, owned by application state.
#[derive(Clone)]
pub struct LanguageModel {
    slot: ClientSlot,
    timeout: Duration,
}

impl LanguageModel {
    pub fn new(client: Arc<dyn GenerativeClient>, timeout: Duration) -> Self {
        Self {
            slot: ClientSlot::Ready(client),
            timeout,
        }
    }

    /// A handle whose every call fails with a configuration error.
    pub fn unavailable(reason: impl Into<String>, timeout: Duration) -> Self {
        Self {
            slot: ClientSlot::Unavailable(reason.into()),
            timeout,
        }
    }

    pub fn from_client(
        client: Result<Arc<dyn GenerativeClient>, LlmError>,
        timeout: Duration,
    ) -> Self {
        match client {
            Ok(client) => Self::new(client, timeout),
            Err(err) => Self::unavailable(err.to_string(), timeout),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.slot, ClientSlot::Ready(_))
    }

    pub fn model_name(&self) -> Option<&str> {
        match &self.slot {
            ClientSlot::Ready(client) => Some(client.model_name()),
            ClientSlot::Unavailable(_) => None,
        }
    }

    /// Single attempt bounded by the configured timeout. Blank output is an error.
    pub async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, LlmError> {
        let client = match &self.slot {
            ClientSlot::Ready(client) => client,
            ClientSlot::Unavailable(reason) => {
                return Err(LlmError::Configuration(reason.clone()));
            }
        };

        let text = tokio::time::timeout(self.timeout, client.generate(prompt, history))
            .await
            .map_err(|_| LlmError::Timeout {
                elapsed_ms: self.timeout.as_millis(),
            })??;

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub enum Script {
        Reply(String),
        Fail(fn() -> LlmError),
        Hang,
    }

    /// Deterministic stand-in for a hosted model.
    pub struct ScriptedClient {
        script: Script,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn replying(text: &str) -> Arc<Self> {
            Self::new(Script::Reply(text.to_string()))
        }

        pub fn failing(make: fn() -> LlmError) -> Arc<Self> {
            Self::new(Script::Fail(make))
        }

        pub fn hanging() -> Arc<Self> {
            Self::new(Script::Hang)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().ok()?.last().cloned()
        }
    }

    #[async_trait]
    impl GenerativeClient for ScriptedClient {
        async fn generate(
            &self,
            prompt: &str,
            _history: &[ChatMessage],
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            match &self.script {
                Script::Reply(text) => Ok(text.clone()),
                Script::Fail(make) => Err(make()),
                Script::Hang => std::future::pending().await,
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }
}
