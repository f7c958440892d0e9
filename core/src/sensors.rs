//! Threshold-based assessment of field sensor readings.
//!
//! Readings arrive from the telemetry provider (a ThingSpeak channel) as
//! string-typed `fieldN` values; everything here is pure and synchronous.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Numeric readings for one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadings {
    /// Air temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// Volumetric soil moisture in %
    pub soil_moisture: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<f64>,
}

/// Last entry of a ThingSpeak channel feed.
///
/// field1 soil moisture, field2 humidity, field3 temperature, field4 light,
/// field5 rainfall, field6 wind speed, field7 soil pH.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChannelFeedEntry {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub entry_id: Option<u64>,
    #[serde(default)]
    pub field1: Option<String>,
    #[serde(default)]
    pub field2: Option<String>,
    #[serde(default)]
    pub field3: Option<String>,
    #[serde(default)]
    pub field4: Option<String>,
    #[serde(default)]
    pub field5: Option<String>,
    #[serde(default)]
    pub field6: Option<String>,
    #[serde(default)]
    pub field7: Option<String>,
}

fn parse_field(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

impl ChannelFeedEntry {
    /// Convert to numeric readings. Unparseable core readings become 0,
    /// unparseable optional readings are dropped.
    pub fn readings(&self) -> SensorReadings {
        SensorReadings {
            soil_moisture: parse_field(self.field1.as_deref()).unwrap_or(0.0),
            humidity: parse_field(self.field2.as_deref()).unwrap_or(0.0),
            temperature: parse_field(self.field3.as_deref()).unwrap_or(0.0),
            light: parse_field(self.field4.as_deref()),
            rainfall: parse_field(self.field5.as_deref()),
            wind_speed: parse_field(self.field6.as_deref()),
            soil_ph: parse_field(self.field7.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SensorStatus {
    Optimal,
    Warning,
    Critical,
}

pub fn temperature_status(celsius: f64) -> SensorStatus {
    if celsius > 35.0 {
        SensorStatus::Critical
    } else if celsius > 30.0 {
        SensorStatus::Warning
    } else {
        SensorStatus::Optimal
    }
}

pub fn humidity_status(percent: f64) -> SensorStatus {
    if !(20.0..=90.0).contains(&percent) {
        SensorStatus::Critical
    } else if !(30.0..=80.0).contains(&percent) {
        SensorStatus::Warning
    } else {
        SensorStatus::Optimal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MoistureBand {
    Dry,
    Optimal,
    Wet,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MoistureAssessment {
    pub band: MoistureBand,
    pub status: SensorStatus,
    pub recommendation: String,
}

pub fn soil_moisture_assessment(percent: f64) -> MoistureAssessment {
    let (band, recommendation) = if percent < 30.0 {
        (MoistureBand::Dry, "Irrigation recommended soon")
    } else if percent > 60.0 {
        (MoistureBand::Wet, "Reduce irrigation, check drainage")
    } else {
        (MoistureBand::Optimal, "Moisture levels ideal for most crops")
    };
    let status = match band {
        MoistureBand::Optimal => SensorStatus::Optimal,
        MoistureBand::Dry | MoistureBand::Wet => SensorStatus::Warning,
    };
    MoistureAssessment {
        band,
        status,
        recommendation: recommendation.to_string(),
    }
}

/// Overall banner state for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Operational,
    Warning,
    Alert,
}

impl SystemStatus {
    pub fn from_readings(readings: &SensorReadings) -> Self {
        if readings.temperature > 30.0 || readings.soil_moisture < 20.0 {
            SystemStatus::Warning
        } else if readings.humidity > 80.0 {
            SystemStatus::Alert
        } else {
            SystemStatus::Operational
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SystemStatus::Operational => "All sensors are reporting optimal readings.",
            SystemStatus::Warning => {
                "Some sensor readings are outside normal parameters. Monitor closely."
            }
            SystemStatus::Alert => {
                "Critical sensor readings detected. Immediate attention required."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PestRiskLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PestRisk {
    pub risk: PestRiskLevel,
    pub pests: Vec<String>,
    pub recommendation: String,
}

/// Warm, humid weather raises pest pressure.
pub fn pest_risk(temperature: f64, humidity: f64) -> PestRisk {
    let (risk, pests, recommendation): (_, &[&str], _) = if temperature > 25.0 && humidity > 70.0 {
        (
            PestRiskLevel::High,
            &["Aphids", "Spider mites", "Whiteflies", "Fungal diseases"],
            "Increase monitoring frequency. Consider preventative treatment.",
        )
    } else if temperature > 20.0 && humidity > 60.0 {
        (
            PestRiskLevel::Moderate,
            &["Aphids", "Caterpillars"],
            "Regular monitoring recommended. Check undersides of leaves.",
        )
    } else {
        (
            PestRiskLevel::Low,
            &[],
            "Standard monitoring procedures sufficient.",
        )
    };
    PestRisk {
        risk,
        pests: pests.iter().map(|pest| pest.to_string()).collect(),
        recommendation: recommendation.to_string(),
    }
}

const CROP_WATER_FACTORS: &[(&str, f64)] = &[
    ("corn", 1.2),
    ("wheat", 0.9),
    ("rice", 1.5),
    ("soybeans", 1.0),
    ("cotton", 1.1),
    ("potatoes", 1.1),
    ("tomatoes", 1.2),
];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaterRequirement {
    pub crop: String,
    pub needs_water: bool,
    pub schedule: String,
    pub amount: String,
}

/// Irrigation estimate for a crop under current conditions.
pub fn water_requirement(crop: &str, readings: &SensorReadings) -> WaterRequirement {
    let crop_key = crop.trim().to_lowercase();
    let crop_factor = CROP_WATER_FACTORS
        .iter()
        .find(|(name, _)| *name == crop_key)
        .map(|(_, factor)| *factor)
        .unwrap_or(1.0);

    let temp_factor = if readings.temperature > 25.0 {
        1.3
    } else if readings.temperature < 15.0 {
        0.8
    } else {
        1.0
    };
    let humidity_factor = if readings.humidity < 40.0 {
        1.2
    } else if readings.humidity > 80.0 {
        0.7
    } else {
        1.0
    };
    let moisture_factor = if readings.soil_moisture < 30.0 {
        1.5
    } else if readings.soil_moisture > 60.0 {
        0.5
    } else {
        1.0
    };

    let need = crop_factor * temp_factor * humidity_factor * moisture_factor;
    if need > 1.2 && readings.soil_moisture < 50.0 {
        WaterRequirement {
            crop: crop.trim().to_string(),
            needs_water: true,
            schedule: if readings.temperature > 28.0 {
                "Morning and evening".to_string()
            } else {
                "Morning only".to_string()
            },
            amount: format!("{} liters per square meter", (need * 5.0).round() as i64),
        }
    } else {
        WaterRequirement {
            crop: crop.trim().to_string(),
            needs_water: false,
            schedule: "No irrigation needed for next 24 hours".to_string(),
            amount: "0 liters".to_string(),
        }
    }
}

/// Kind of reading, used for unit formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Moisture,
    Light,
    Rainfall,
    Wind,
    Ph,
}

pub fn format_sensor_value(value: f64, kind: SensorKind) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    match kind {
        SensorKind::Temperature => format!("{value:.1}°C"),
        SensorKind::Humidity | SensorKind::Moisture => format!("{value:.1}%"),
        SensorKind::Light => format!("{} lux", value.trunc() as i64),
        SensorKind::Rainfall => format!("{value:.1} mm"),
        SensorKind::Wind => format!("{value:.1} km/h"),
        SensorKind::Ph => format!("pH {value:.1}"),
    }
}

/// Recommendation card shown when a reading crosses an advisory threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdvisoryCard {
    pub title: String,
    pub message: String,
    pub recommendations: Vec<String>,
}

fn card(title: &str, message: &str, recommendations: &[&str]) -> AdvisoryCard {
    AdvisoryCard {
        title: title.to_string(),
        message: message.to_string(),
        recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
    }
}

/// Condition-based advice: humidity below 40%, temperature above 23 °C and
/// soil moisture below 25% each add one card, in that order.
pub fn advisory_cards(readings: &SensorReadings) -> Vec<AdvisoryCard> {
    let mut cards = Vec::new();
    if readings.humidity < 40.0 {
        cards.push(card(
            "Humidity Alert",
            "Current humidity is low. Consider using humidity enhancement techniques:",
            &[
                "Use mulching to retain moisture",
                "Install drip irrigation system",
                "Consider adding humidity trays",
            ],
        ));
    }
    if readings.temperature > 23.0 {
        cards.push(card(
            "Temperature Control",
            "Temperature conditions require adjustment:",
            &[
                "Monitor greenhouse ventilation",
                "Adjust shading if necessary",
                "Consider time of day for operations",
            ],
        ));
    }
    if readings.soil_moisture < 25.0 {
        cards.push(card(
            "Soil Moisture Management",
            "Soil moisture levels need attention:",
            &[
                "Adjust irrigation schedule",
                "Check soil drainage",
                "Consider soil amendments for better moisture retention",
            ],
        ));
    }
    cards
}

/// Complete dashboard assessment for one set of readings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorAssessment {
    pub readings: SensorReadings,
    pub temperature: SensorStatus,
    pub humidity: SensorStatus,
    pub soil_moisture: MoistureAssessment,
    pub system: SystemStatus,
    pub system_message: String,
    pub pest_risk: PestRisk,
    pub advisories: Vec<AdvisoryCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<WaterRequirement>,
}

pub fn assess(readings: SensorReadings, crop: Option<&str>) -> SensorAssessment {
    let system = SystemStatus::from_readings(&readings);
    SensorAssessment {
        temperature: temperature_status(readings.temperature),
        humidity: humidity_status(readings.humidity),
        soil_moisture: soil_moisture_assessment(readings.soil_moisture),
        system,
        system_message: system.message().to_string(),
        pest_risk: pest_risk(readings.temperature, readings.humidity),
        advisories: advisory_cards(&readings),
        water: crop
            .map(str::trim)
            .filter(|crop| !crop.is_empty())
            .map(|crop| water_requirement(crop, &readings)),
        readings,
    }
}
