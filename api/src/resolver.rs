//! Disease-advice resolution: live model call, then the curated knowledge
//! table, then the generic template. Resolution never fails.

use std::time::Instant;

use krishi_core::advice::{
    Degradation, DiseaseAdvice, display_name, healthy_advice, is_healthy_label,
};
use krishi_core::knowledge::fallback_advice;

use crate::llm::recovery::recover_json;
use crate::llm::{LanguageModel, LlmError};

#[derive(Clone)]
pub struct AdviceResolver {
    model: LanguageModel,
}

fn confidence_percent(confidence: f64) -> i64 {
    if confidence.is_finite() {
        (confidence * 100.0).round() as i64
    } else {
        0
    }
}

pub(crate) fn advice_prompt(disease_name: &str, confidence: f64) -> String {
    let percent = confidence_percent(confidence);
    format!(
        r#"I need comprehensive information about {disease_name} in plants, which has been detected with {percent}% confidence by a machine learning model.

Please provide the following information in a structured format:
1. Brief description of the disease
2. Scientific name of the pathogen (if applicable)
3. Common symptoms (as a list)
4. Recommended treatments (as a list)
5. Prevention methods (as a list)
6. Severity assessment (Low, Medium, or High) based on the confidence level and typical impact
7. Organic/natural treatment options (as a list)
8. Expected recovery time with proper treatment

Format your response as a well-structured JSON object with the following fields:
{{
  "description": "Brief description of the disease",
  "scientificName": "Scientific name of the pathogen",
  "symptoms": ["symptom1", "symptom2", "symptom3"],
  "treatments": ["treatment1", "treatment2", "treatment3"],
  "preventions": ["prevention1", "prevention2", "prevention3"],
  "severity": "Low/Medium/High",
  "organicSolutions": ["organic solution1", "organic solution2", "organic solution3"],
  "expectedRecoveryTime": "Expected recovery time description"
}}

This is for a farmer who needs practical advice to manage this plant disease effectively."#
    )
}

impl AdviceResolver {
    pub fn new(model: LanguageModel) -> Self {
        Self { model }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_configured()
    }

    /// Resolve advice for a classifier label and its confidence in `[0, 1]`.
    ///
    /// Healthy labels short-circuit without touching the model. Any failure of
    /// the live call is logged and answered from the fallback tiers.
    pub async fn resolve_advice(&self, label: &str, confidence: f64) -> DiseaseAdvice {
        if is_healthy_label(label) {
            tracing::debug!(label = %label, tier = "healthy", "Healthy label, skipping model");
            return healthy_advice();
        }

        let started = Instant::now();
        let disease_name = display_name(label);

        let advice = match self.live_advice(&disease_name, confidence).await {
            Ok(advice) => advice,
            Err(err) => {
                let degradation = Degradation::new(err.degradation_reason(), err.to_string());
                tracing::warn!(
                    label = %label,
                    reason = degradation.reason.as_str(),
                    error = %err,
                    "Live advice unavailable, using fallback"
                );
                fallback_advice(label, confidence, &degradation)
            }
        };

        tracing::info!(
            label = %label,
            tier = advice.tier.as_str(),
            degraded = advice.tier.is_degraded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Disease advice resolved"
        );
        advice
    }

    async fn live_advice(
        &self,
        disease_name: &str,
        confidence: f64,
    ) -> Result<DiseaseAdvice, LlmError> {
        let prompt = advice_prompt(disease_name, confidence);
        let text = self.model.generate(&prompt, &[]).await?;

        let object = recover_json(&text).into_object().ok_or_else(|| {
            LlmError::MalformedResponse("no JSON object found in model output".to_string())
        })?;
        Ok(DiseaseAdvice::from_model_output(
            disease_name,
            confidence,
            &object,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use krishi_core::advice::{AdviceTier, DegradationReason, Severity};

    use super::*;
    use crate::llm::testing::ScriptedClient;

    const VALID_RESPONSE: &str = r#"{
        "description": "A fungal disease of apple trees.",
        "scientificName": "Venturia inaequalis",
        "symptoms": ["Olive-green spots", "Scabby fruit"],
        "treatments": ["Fungicide at green tip"],
        "preventions": ["Rake fallen leaves"],
        "severity": "Medium",
        "organicSolutions": ["Sulfur spray"],
        "expectedRecoveryTime": "One season"
    }"#;

    fn resolver_with(client: std::sync::Arc<ScriptedClient>, timeout: Duration) -> AdviceResolver {
        AdviceResolver::new(LanguageModel::new(client, timeout))
    }

    fn transport_failure() -> LlmError {
        LlmError::Transport("connection refused".to_string())
    }

    #[tokio::test]
    async fn healthy_label_never_calls_model() {
        let client = ScriptedClient::replying(VALID_RESPONSE);
        let resolver = resolver_with(client.clone(), Duration::from_secs(1));

        let advice = resolver.resolve_advice("Tomato___healthy", 0.99).await;

        assert_eq!(client.calls(), 0);
        assert!(advice.symptoms.is_empty());
        assert!(advice.treatments.is_empty());
        assert_eq!(advice.severity, Severity::Low);
        assert_eq!(advice.tier, AdviceTier::Healthy);
    }

    #[tokio::test]
    async fn healthy_label_skips_configuration_check() {
        let resolver = AdviceResolver::new(LanguageModel::unavailable(
            "GEMINI_API_KEY is not set",
            Duration::from_secs(1),
        ));
        let advice = resolver.resolve_advice("Apple___HEALTHY", 0.7).await;
        assert_eq!(advice.tier, AdviceTier::Healthy);
        assert!(advice.error_message.is_none());
    }

    #[tokio::test]
    async fn valid_response_round_trips() {
        let resolver = resolver_with(ScriptedClient::replying(VALID_RESPONSE), Duration::from_secs(1));

        let advice = resolver.resolve_advice("Apple___Apple_scab", 0.72).await;

        assert_eq!(advice.disease_name, "Apple Apple scab");
        assert_eq!(advice.scientific_name, "Venturia inaequalis");
        assert_eq!(advice.description, "A fungal disease of apple trees.");
        assert_eq!(advice.symptoms, vec!["Olive-green spots", "Scabby fruit"]);
        assert_eq!(advice.treatments, vec!["Fungicide at green tip"]);
        assert_eq!(advice.preventions, vec!["Rake fallen leaves"]);
        assert_eq!(advice.organic_solutions, vec!["Sulfur spray"]);
        assert_eq!(advice.severity, Severity::Medium);
        assert_eq!(advice.expected_recovery_time, "One season");
        assert_eq!(advice.tier, AdviceTier::Live);
        assert!(advice.error_message.is_none());
        assert!(advice.degradation.is_none());
    }

    #[tokio::test]
    async fn json_wrapped_in_prose_is_recovered() {
        let resolver = resolver_with(
            ScriptedClient::replying(
                r#"Here is the data: {"description":"x","symptoms":["a"]} Thanks!"#,
            ),
            Duration::from_secs(1),
        );

        let advice = resolver.resolve_advice("Grape___Black_rot", 0.9).await;

        assert_eq!(advice.description, "x");
        assert_eq!(advice.symptoms, vec!["a"]);
        assert!(advice.treatments.is_empty());
        assert!(advice.preventions.is_empty());
        assert!(advice.organic_solutions.is_empty());
        assert_eq!(advice.severity, Severity::High);
        assert_eq!(advice.scientific_name, "Not available");
        assert_eq!(advice.tier, AdviceTier::Live);
    }

    #[tokio::test]
    async fn prompt_states_rounded_confidence() {
        let client = ScriptedClient::replying(VALID_RESPONSE);
        let resolver = resolver_with(client.clone(), Duration::from_secs(1));

        resolver.resolve_advice("Tomato___Late_blight", 0.876).await;

        let prompt = client.last_prompt().expect("prompt should be recorded");
        assert!(prompt.contains("Tomato Late blight"));
        assert!(prompt.contains("88% confidence"));
    }

    #[tokio::test]
    async fn known_label_falls_back_to_knowledge_table() {
        let resolver = resolver_with(
            ScriptedClient::failing(transport_failure),
            Duration::from_secs(1),
        );

        let advice = resolver.resolve_advice("Apple___Apple_scab", 0.7).await;

        assert!(advice.success);
        assert_eq!(advice.scientific_name, "Venturia inaequalis");
        assert_eq!(advice.tier, AdviceTier::FallbackTable);
        assert_eq!(advice.degradation, Some(DegradationReason::Transport));
        let message = advice.error_message.expect("fallback must explain itself");
        assert!(message.starts_with("Using fallback data. Original error:"));
        assert!(message.contains("connection refused"));
    }

    #[tokio::test]
    async fn unknown_label_falls_back_to_generic_template() {
        let resolver = resolver_with(
            ScriptedClient::failing(transport_failure),
            Duration::from_secs(1),
        );

        let advice = resolver.resolve_advice("Banana___Weird_Disease", 0.4).await;

        assert!(advice.success);
        assert_eq!(advice.tier, AdviceTier::Generic);
        assert_eq!(advice.severity, Severity::Medium);
        assert!(!advice.symptoms.is_empty());
        assert!(!advice.treatments.is_empty());
        assert!(!advice.preventions.is_empty());
        assert!(!advice.organic_solutions.is_empty());
        assert!(advice.error_message.is_some());
    }

    #[tokio::test]
    async fn unparseable_reply_is_malformed_degradation() {
        let resolver = resolver_with(
            ScriptedClient::replying("I am unable to answer that."),
            Duration::from_secs(1),
        );

        let advice = resolver.resolve_advice("Tomato___Late_blight", 0.9).await;

        assert_eq!(advice.tier, AdviceTier::FallbackTable);
        assert_eq!(advice.degradation, Some(DegradationReason::MalformedResponse));
        assert_eq!(advice.scientific_name, "Phytophthora infestans");
    }

    #[tokio::test]
    async fn hanging_model_resolves_within_timeout() {
        let resolver = resolver_with(ScriptedClient::hanging(), Duration::from_millis(50));

        let advice = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.resolve_advice("Apple___Apple_scab", 0.9),
        )
        .await
        .expect("resolution must not hang");

        assert_eq!(advice.tier, AdviceTier::FallbackTable);
        assert_eq!(advice.degradation, Some(DegradationReason::Timeout));
    }

    #[tokio::test]
    async fn unconfigured_model_reports_configuration_degradation() {
        let resolver = AdviceResolver::new(LanguageModel::unavailable(
            "GEMINI_API_KEY is not set",
            Duration::from_secs(1),
        ));

        let advice = resolver.resolve_advice("Corn___Common_rust_", 0.65).await;

        assert_eq!(advice.tier, AdviceTier::FallbackTable);
        assert_eq!(advice.degradation, Some(DegradationReason::Configuration));
        assert_eq!(advice.scientific_name, "Puccinia sorghi");
    }

    #[tokio::test]
    async fn resolution_is_idempotent_with_deterministic_model() {
        let resolver = resolver_with(ScriptedClient::replying(VALID_RESPONSE), Duration::from_secs(1));
        let first = resolver.resolve_advice("Apple___Apple_scab", 0.72).await;
        let second = resolver.resolve_advice("Apple___Apple_scab", 0.72).await;
        assert_eq!(first, second);

        let failing = resolver_with(
            ScriptedClient::failing(transport_failure),
            Duration::from_secs(1),
        );
        let first = failing.resolve_advice("Banana___Weird_Disease", 0.3).await;
        let second = failing.resolve_advice("Banana___Weird_Disease", 0.3).await;
        assert_eq!(first, second);
    }

    #[test]
    fn non_finite_confidence_renders_as_zero_percent() {
        assert!(advice_prompt("Apple scab", f64::NAN).contains("0% confidence"));
    }
}
