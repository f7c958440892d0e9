//! Agronomy chat assistant and crop recommendations.

use chrono::NaiveDate;
use krishi_core::sensors::{SensorKind, SensorReadings, format_sensor_value};
use serde::Serialize;
use utoipa::ToSchema;

use crate::llm::recovery::recover_json;
use crate::llm::{ChatMessage, LanguageModel, LlmError};

const SYSTEM_PROMPT: &str = "You are KrishiGPT, an agricultural assistant specializing in:

- Crop recommendations based on soil conditions, climate, and market trends
- Pest and disease identification and management advice
- Weather-based farming recommendations
- Sustainable farming practices
- Water management and irrigation scheduling
- Equipment troubleshooting
- Market price predictions and agricultural economics
- Seasonal planting and harvesting advice

Respond with accurate, actionable agricultural guidance. Use clear language that farmers can understand and implement.
When providing recommendations, always consider sustainability and best environmental practices. If you're uncertain,
acknowledge the limits of your knowledge and suggest consulting a local agricultural extension service.";

pub const DEFAULT_CROPS: &[&str] = &["Wheat", "Corn", "Soybeans", "Tomatoes", "Potatoes"];

/// Where a crop list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CropSource {
    Model,
    Default,
}

/// Field conditions used to ask for crop suggestions.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConditions {
    pub soil_type: String,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CropRecommendations {
    pub crops: Vec<String>,
    pub source: CropSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn sensor_context(readings: &SensorReadings) -> String {
    let mut lines = vec![
        "Current field sensor readings:".to_string(),
        format!(
            "- Temperature: {}",
            format_sensor_value(readings.temperature, SensorKind::Temperature)
        ),
        format!(
            "- Humidity: {}",
            format_sensor_value(readings.humidity, SensorKind::Humidity)
        ),
        format!(
            "- Soil moisture: {}",
            format_sensor_value(readings.soil_moisture, SensorKind::Moisture)
        ),
    ];
    let optional = [
        ("Light", readings.light, SensorKind::Light),
        ("Rainfall", readings.rainfall, SensorKind::Rainfall),
        ("Wind speed", readings.wind_speed, SensorKind::Wind),
        ("Soil pH", readings.soil_ph, SensorKind::Ph),
    ];
    for (name, value, kind) in optional {
        if let Some(value) = value {
            lines.push(format!("- {name}: {}", format_sensor_value(value, kind)));
        }
    }
    lines.join("\n")
}

pub(crate) fn chat_prompt(
    message: &str,
    sensors: Option<&SensorReadings>,
    today: NaiveDate,
) -> String {
    let mut prompt = format!("{SYSTEM_PROMPT}\n\nCurrent date: {today}\n");
    if let Some(readings) = sensors {
        prompt.push('\n');
        prompt.push_str(&sensor_context(readings));
        prompt.push('\n');
    }
    prompt.push_str("\nFarmer's question: ");
    prompt.push_str(message.trim());
    prompt
}

pub(crate) fn crop_prompt(conditions: &FieldConditions) -> String {
    format!(
        r#"As an agricultural expert, recommend 5 suitable crops based on the following conditions:
- Soil Type: {}
- Average Temperature: {}°C
- Humidity: {}%
- Soil Moisture: {}%
- Geographic Region: {}

Return just a simple JSON array of crop names, like: ["Wheat", "Corn", "Soybeans", "Rice", "Cotton"]"#,
        conditions.soil_type,
        conditions.temperature,
        conditions.humidity,
        conditions.soil_moisture,
        conditions.region
    )
}

fn default_crops(error: &LlmError) -> CropRecommendations {
    CropRecommendations {
        crops: DEFAULT_CROPS.iter().map(|crop| crop.to_string()).collect(),
        source: CropSource::Default,
        error_message: Some(error.to_string()),
    }
}

#[derive(Clone)]
pub struct Assistant {
    model: LanguageModel,
}

impl Assistant {
    pub fn new(model: LanguageModel) -> Self {
        Self { model }
    }

    /// Answer one chat turn. Failures surface to the caller.
    pub async fn reply(
        &self,
        history: &[ChatMessage],
        message: &str,
        sensors: Option<&SensorReadings>,
    ) -> Result<String, LlmError> {
        let prompt = chat_prompt(message, sensors, chrono::Utc::now().date_naive());
        let reply = self.model.generate(&prompt, history).await?;
        tracing::info!(history_len = history.len(), "Assistant reply generated");
        Ok(reply.trim().to_string())
    }

    /// Suggest crops for the given conditions; the default list is used on any failure.
    pub async fn recommend_crops(&self, conditions: &FieldConditions) -> CropRecommendations {
        match self.model_crops(conditions).await {
            Ok(crops) => CropRecommendations {
                crops,
                source: CropSource::Model,
                error_message: None,
            },
            Err(err) => {
                tracing::warn!(
                    reason = err.degradation_reason().as_str(),
                    error = %err,
                    "Crop recommendations unavailable, using default list"
                );
                default_crops(&err)
            }
        }
    }

    async fn model_crops(&self, conditions: &FieldConditions) -> Result<Vec<String>, LlmError> {
        let text = self.model.generate(&crop_prompt(conditions), &[]).await?;
        let crops: Vec<String> = recover_json(&text)
            .into_array()
            .ok_or_else(|| {
                LlmError::MalformedResponse("no JSON array found in model output".to_string())
            })?
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|crop| !crop.is_empty())
            .map(str::to_string)
            .collect();

        if crops.is_empty() {
            return Err(LlmError::MalformedResponse(
                "model returned no crop names".to_string(),
            ));
        }
        Ok(crops)
    }
}
