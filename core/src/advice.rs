use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Substring (case-insensitive) that marks a classifier label as a healthy plant.
pub const HEALTHY_MARKER: &str = "healthy";

/// Placeholder used when the pathogen's scientific name is unknown.
pub const NOT_AVAILABLE: &str = "Not available";

const LOW_CONFIDENCE_MAX: f64 = 0.60;
const MEDIUM_CONFIDENCE_MAX: f64 = 0.85;

/// Severity of a detected disease as shown on the advisory card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Derive severity from classifier confidence using closed-open bands:
    /// `[0, 0.60)` Low, `[0.60, 0.85)` Medium, `[0.85, ..)` High.
    /// Non-finite input is treated as zero confidence.
    pub fn from_confidence(confidence: f64) -> Self {
        let confidence = if confidence.is_finite() { confidence } else { 0.0 };
        if confidence < LOW_CONFIDENCE_MAX {
            Severity::Low
        } else if confidence < MEDIUM_CONFIDENCE_MAX {
            Severity::Medium
        } else {
            Severity::High
        }
    }

    /// Parse a model-provided severity label. Only the three known labels are
    /// accepted (any case, surrounding whitespace ignored).
    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

/// Which resolution strategy produced a [`DiseaseAdvice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum AdviceTier {
    /// Generated by the language model for this request.
    Live,
    /// Taken from the curated knowledge table.
    FallbackTable,
    /// Broad template used when nothing more specific was available.
    Generic,
    /// Canned maintenance advice for a healthy plant.
    Healthy,
}

impl AdviceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            AdviceTier::Live => "live",
            AdviceTier::FallbackTable => "fallbackTable",
            AdviceTier::Generic => "generic",
            AdviceTier::Healthy => "healthy",
        }
    }

    pub fn is_degraded(self) -> bool {
        matches!(self, AdviceTier::FallbackTable | AdviceTier::Generic)
    }
}

/// Why the live tier could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum DegradationReason {
    /// The language-model client could not be constructed (e.g. missing key).
    Configuration,
    /// Network failure, non-success status, or an error payload upstream.
    Transport,
    /// The upstream call exceeded its time budget.
    Timeout,
    /// Text came back but no JSON object could be recovered from it.
    MalformedResponse,
}

impl DegradationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DegradationReason::Configuration => "configuration",
            DegradationReason::Transport => "transport",
            DegradationReason::Timeout => "timeout",
            DegradationReason::MalformedResponse => "malformedResponse",
        }
    }
}

/// Failure of the live tier: the structured reason plus the upstream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub reason: DegradationReason,
    pub message: String,
}

impl Degradation {
    pub fn new(reason: DegradationReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// Structured treatment advice for one classification result.
///
/// Every list is always present (possibly empty). `success` is always true:
/// callers detect degraded advice through `tier`/`degradation`, with
/// `error_message` kept for display and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseAdvice {
    pub disease_name: String,
    pub scientific_name: String,
    pub description: String,
    pub symptoms: Vec<String>,
    pub treatments: Vec<String>,
    pub preventions: Vec<String>,
    pub severity: Severity,
    pub organic_solutions: Vec<String>,
    pub expected_recovery_time: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub tier: AdviceTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<DegradationReason>,
}

impl DiseaseAdvice {
    /// Build live-tier advice from a JSON object returned by the language model.
    ///
    /// Sequence fields that are not arrays become empty, non-string items are
    /// dropped, and an unknown or missing severity falls back to
    /// [`Severity::from_confidence`].
    pub fn from_model_output(
        disease_name: &str,
        confidence: f64,
        object: &Map<String, Value>,
    ) -> Self {
        let severity = object
            .get("severity")
            .and_then(Value::as_str)
            .and_then(Severity::parse_label)
            .unwrap_or_else(|| Severity::from_confidence(confidence));

        Self {
            disease_name: disease_name.to_string(),
            scientific_name: text_field(object, "scientificName")
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            description: text_field(object, "description")
                .unwrap_or_else(|| format!("Information about {disease_name}")),
            symptoms: list_field(object, "symptoms"),
            treatments: list_field(object, "treatments"),
            preventions: list_field(object, "preventions"),
            severity,
            organic_solutions: list_field(object, "organicSolutions"),
            expected_recovery_time: text_field(object, "expectedRecoveryTime")
                .unwrap_or_else(|| "Varies based on treatment and conditions".to_string()),
            success: true,
            error_message: None,
            tier: AdviceTier::Live,
            degradation: None,
        }
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

fn list_field(object: &Map<String, Value>, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// True when the classifier label names a healthy plant.
pub fn is_healthy_label(label: &str) -> bool {
    label.to_lowercase().contains(HEALTHY_MARKER)
}

/// Turn a classifier label such as `Tomato___Late_blight` into `Tomato Late blight`.
pub fn display_name(label: &str) -> String {
    label
        .replace("___", " ")
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Canned advice for a healthy plant. Never involves the language model.
pub fn healthy_advice() -> DiseaseAdvice {
    DiseaseAdvice {
        disease_name: "Healthy Plant".to_string(),
        scientific_name: "N/A".to_string(),
        description: "No disease detected. The plant appears to be healthy.".to_string(),
        symptoms: Vec::new(),
        treatments: Vec::new(),
        preventions: strings(&[
            "Continue regular watering schedule",
            "Maintain proper fertilization",
            "Monitor for any changes in appearance",
            "Ensure adequate sunlight exposure",
            "Practice good garden hygiene",
        ]),
        severity: Severity::Low,
        organic_solutions: strings(&[
            "Use organic compost for soil health",
            "Apply neem oil as a preventative measure",
            "Introduce beneficial insects to control pests",
        ]),
        expected_recovery_time: "N/A".to_string(),
        success: true,
        error_message: None,
        tier: AdviceTier::Healthy,
        degradation: None,
    }
}

/// Broad advice used when neither the model nor the knowledge table could help.
pub fn generic_advice(disease_name: &str, degradation: &Degradation) -> DiseaseAdvice {
    DiseaseAdvice {
        disease_name: disease_name.to_string(),
        scientific_name: NOT_AVAILABLE.to_string(),
        description: format!(
            "{disease_name} information could not be retrieved, but we can provide general plant disease management advice."
        ),
        symptoms: strings(&[
            "Leaf discoloration",
            "Spots or lesions",
            "Wilting or drooping",
            "Stunted growth",
            "Unusual leaf drop",
        ]),
        treatments: strings(&[
            "Remove and destroy heavily infected plant parts",
            "Apply appropriate fungicide or bactericide based on diagnosis",
            "Ensure plants receive optimal growing conditions",
            "Consult a local agricultural extension office for specific advice",
            "Isolate infected plants to prevent spread",
        ]),
        preventions: strings(&[
            "Improve air circulation around plants",
            "Avoid overhead watering and keep foliage dry",
            "Use disease-resistant varieties when available",
            "Practice crop rotation and proper spacing",
            "Maintain good garden sanitation",
        ]),
        severity: Severity::Medium,
        organic_solutions: strings(&[
            "Apply neem oil spray as a broad-spectrum organic treatment",
            "Use compost tea as a preventative measure and soil health booster",
            "Try diluted hydrogen peroxide spray for bacterial issues",
            "Consider milk spray (1:10 ratio with water) for powdery mildew",
            "Apply garlic or hot pepper spray as organic deterrents",
        ]),
        expected_recovery_time:
            "Varies by disease and treatment effectiveness - typically 2-6 weeks with proper care"
                .to_string(),
        success: true,
        error_message: Some(degradation.message.clone()),
        tier: AdviceTier::Generic,
        degradation: Some(degradation.reason),
    }
}
