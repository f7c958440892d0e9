use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Settings for the hosted language model.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `None` leaves the service in fallback-only mode.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Budget for one model call, including the response body.
    pub timeout: Duration,
}

/// Settings for the image-classification backend.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Base URL of the prediction backend; `None` disables diagnoses.
    pub predict_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub llm: LlmConfig,
    pub classifier: ClassifierConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match read("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
                expected: "a TCP port number",
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match read("KRISHI_ADVICE_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "KRISHI_ADVICE_TIMEOUT_SECS",
                        value: raw,
                        expected: "a positive number of seconds",
                    });
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let cors_origins = read("KRISHI_CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            port,
            cors_origins,
            llm: LlmConfig {
                api_key: read("GEMINI_API_KEY"),
                model: read("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: read("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            classifier: ClassifierConfig {
                predict_url: read("KRISHI_PREDICT_URL"),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}
