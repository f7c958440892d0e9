//! Image classification through the prediction backend.
//!
//! The backend takes a base64-encoded leaf photo on `POST /api/predict` and
//! answers `{className, probability}`. `Classifier` wraps an optional client
//! with the same per-call time budget the language model uses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;

/// One classifier result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Raw class label, e.g. `Tomato___Late_blight`
    pub class_name: String,
    /// Probability of the top class in [0, 1]
    pub probability: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("image classifier is not configured: {0}")]
    Configuration(String),
    #[error("image classifier request failed: {0}")]
    Transport(String),
    #[error("image classifier returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("image classifier timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u128 },
    #[error("image classifier response is invalid: {0}")]
    MalformedResponse(String),
}

/// A service that labels a plant image.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classify a base64 image (a `data:` URL prefix is allowed).
    async fn predict(&self, image: &str) -> Result<Prediction, PredictionError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// HTTP client for the prediction backend.
pub struct PredictionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PredictionClient {
    /// Fails with [`PredictionError::Configuration`] when no backend URL is set.
    pub fn new(config: &ClassifierConfig) -> Result<Self, PredictionError> {
        let base_url = config.predict_url.as_deref().ok_or_else(|| {
            PredictionError::Configuration("KRISHI_PREDICT_URL is not set".to_string())
        })?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| {
                PredictionError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            endpoint: format!("{}/api/predict", base_url.trim_end_matches('/')),
        })
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|body| body.error)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}

/// Reject results the advice resolver cannot use.
fn check_prediction(prediction: Prediction) -> Result<Prediction, PredictionError> {
    if prediction.class_name.trim().is_empty() {
        return Err(PredictionError::MalformedResponse(
            "className is empty".to_string(),
        ));
    }
    if !prediction.probability.is_finite() || !(0.0..=1.0).contains(&prediction.probability) {
        return Err(PredictionError::MalformedResponse(format!(
            "probability {} is outside [0, 1]",
            prediction.probability
        )));
    }
    Ok(prediction)
}

#[async_trait]
impl ImageClassifier for PredictionClient {
    async fn predict(&self, image: &str) -> Result<Prediction, PredictionError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&PredictRequest { image })
            .send()
            .await
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                endpoint = %self.endpoint,
                status = %status,
                "Prediction backend returned non-success status"
            );
            return Err(PredictionError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| PredictionError::MalformedResponse(e.to_string()))
    }
}

#[derive(Clone)]
enum ClassifierSlot {
    Ready(Arc<dyn ImageClassifier>),
    Unavailable(String),
}

/// Shared handle to the image classifier, owned by application state.
#[derive(Clone)]
pub struct Classifier {
    slot: ClassifierSlot,
    timeout: Duration,
}

impl Classifier {
    pub fn new(client: Arc<dyn ImageClassifier>, timeout: Duration) -> Self {
        Self {
            slot: ClassifierSlot::Ready(client),
            timeout,
        }
    }

    pub fn unavailable(reason: impl Into<String>, timeout: Duration) -> Self {
        Self {
            slot: ClassifierSlot::Unavailable(reason.into()),
            timeout,
        }
    }

    pub fn from_client(
        client: Result<Arc<dyn ImageClassifier>, PredictionError>,
        timeout: Duration,
    ) -> Self {
        match client {
            Ok(client) => Self::new(client, timeout),
            Err(err) => Self::unavailable(err.to_string(), timeout),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.slot, ClassifierSlot::Ready(_))
    }

    /// Single attempt bounded by the configured timeout.
    pub async fn predict(&self, image: &str) -> Result<Prediction, PredictionError> {
        let client = match &self.slot {
            ClassifierSlot::Ready(client) => client,
            ClassifierSlot::Unavailable(reason) => {
                return Err(PredictionError::Configuration(reason.clone()));
            }
        };

        let prediction = tokio::time::timeout(self.timeout, client.predict(image))
            .await
            .map_err(|_| PredictionError::Timeout {
                elapsed_ms: self.timeout.as_millis(),
            })??;
        check_prediction(prediction)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub enum Outcome {
        Label(&'static str, f64),
        Fail(fn() -> PredictionError),
        Hang,
    }

    /// Classifier returning a fixed outcome.
    pub struct StubClassifier {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl StubClassifier {
        pub fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn labelling(class_name: &'static str, probability: f64) -> Arc<Self> {
            Self::new(Outcome::Label(class_name, probability))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageClassifier for StubClassifier {
        async fn predict(&self, _image: &str) -> Result<Prediction, PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Outcome::Label(class_name, probability) => Ok(Prediction {
                    class_name: class_name.to_string(),
                    probability: *probability,
                }),
                Outcome::Fail(make) => Err(make()),
                Outcome::Hang => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Outcome, StubClassifier};
    use super::*;

    fn config(predict_url: Option<&str>) -> ClassifierConfig {
        ClassifierConfig {
            predict_url: predict_url.map(str::to_string),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn new_requires_backend_url() {
        assert!(matches!(
            PredictionClient::new(&config(None)),
            Err(PredictionError::Configuration(_))
        ));
    }

    #[test]
    fn new_builds_predict_endpoint() {
        let client =
            PredictionClient::new(&config(Some("http://localhost:8000/"))).expect("client should build");
        assert_eq!(client.endpoint, "http://localhost:8000/api/predict");
    }

    #[test]
    fn response_uses_camel_case_fields() {
        let prediction: Prediction =
            serde_json::from_str(r#"{"className": "Apple___Black_rot", "probability": 0.93}"#)
                .expect("prediction should parse");
        assert_eq!(prediction.class_name, "Apple___Black_rot");
        assert_eq!(prediction.probability, 0.93);
    }

    #[test]
    fn error_message_reads_backend_error_field() {
        assert_eq!(
            error_message(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error": "Failed to load the model"}"#
            ),
            "Failed to load the model"
        );
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, ""),
            "Bad Gateway"
        );
    }

    #[tokio::test]
    async fn out_of_range_probability_is_malformed() {
        let classifier = Classifier::new(
            StubClassifier::labelling("Tomato___Late_blight", 1.7),
            Duration::from_secs(1),
        );
        let err = classifier
            .predict("aGVsbG8=")
            .await
            .expect_err("probability above one must fail");
        assert!(matches!(err, PredictionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn hanging_backend_times_out() {
        let stub = StubClassifier::new(Outcome::Hang);
        let classifier = Classifier::new(stub.clone(), Duration::from_millis(20));
        let err = classifier
            .predict("aGVsbG8=")
            .await
            .expect_err("hanging backend must time out");
        assert!(matches!(err, PredictionError::Timeout { elapsed_ms: 20 }));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn unavailable_classifier_reports_configuration_error() {
        let classifier =
            Classifier::unavailable("KRISHI_PREDICT_URL is not set", Duration::from_secs(1));
        assert!(!classifier.is_configured());
        assert!(matches!(
            classifier.predict("aGVsbG8=").await,
            Err(PredictionError::Configuration(_))
        ));
    }
}
