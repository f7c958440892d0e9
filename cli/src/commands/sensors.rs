use clap::Args;
use serde_json::json;

use crate::util::api_request;

#[derive(Args)]
pub struct SensorReadingArgs {
    /// Air temperature in °C
    #[arg(long)]
    pub temperature: f64,
    /// Relative humidity in %
    #[arg(long)]
    pub humidity: f64,
    /// Soil moisture in %
    #[arg(long)]
    pub soil_moisture: f64,
    /// Light intensity in lux
    #[arg(long)]
    pub light: Option<f64>,
    /// Rainfall in mm
    #[arg(long)]
    pub rainfall: Option<f64>,
    /// Wind speed in km/h
    #[arg(long)]
    pub wind_speed: Option<f64>,
    /// Soil pH
    #[arg(long)]
    pub soil_ph: Option<f64>,
}

impl SensorReadingArgs {
    /// Readings as the API's camelCase JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut readings = json!({
            "temperature": self.temperature,
            "humidity": self.humidity,
            "soilMoisture": self.soil_moisture,
        });
        for (key, value) in [
            ("light", self.light),
            ("rainfall", self.rainfall),
            ("windSpeed", self.wind_speed),
            ("soilPh", self.soil_ph),
        ] {
            if let Some(value) = value {
                readings[key] = json!(value);
            }
        }
        readings
    }
}

#[derive(Args)]
pub struct SensorsArgs {
    #[command(flatten)]
    pub readings: SensorReadingArgs,
    /// Crop in the field, for the irrigation estimate (e.g. "rice")
    #[arg(long)]
    pub crop: Option<String>,
}

pub async fn run(api_url: &str, args: SensorsArgs) -> i32 {
    let mut body = args.readings.to_json();
    if let Some(crop) = args.crop {
        body["crop"] = json!(crop);
    }
    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/sensors/assessment",
        Some(body),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_readings_are_omitted_when_absent() {
        let args = SensorReadingArgs {
            temperature: 28.0,
            humidity: 64.0,
            soil_moisture: 35.0,
            light: None,
            rainfall: Some(1.5),
            wind_speed: None,
            soil_ph: None,
        };
        assert_eq!(
            args.to_json(),
            json!({
                "temperature": 28.0,
                "humidity": 64.0,
                "soilMoisture": 35.0,
                "rainfall": 1.5
            })
        );
    }
}
