use clap::Args;
use serde_json::json;

use crate::util::api_request;

#[derive(Args)]
pub struct CropsArgs {
    /// Soil type (e.g. "Loamy", "Black cotton")
    #[arg(long)]
    pub soil_type: String,
    /// Average temperature in °C
    #[arg(long)]
    pub temperature: f64,
    /// Relative humidity in %
    #[arg(long)]
    pub humidity: f64,
    /// Soil moisture in %
    #[arg(long)]
    pub soil_moisture: f64,
    /// Geographic region (e.g. "Punjab")
    #[arg(long)]
    pub region: String,
}

pub async fn run(api_url: &str, args: CropsArgs) -> i32 {
    let body = json!({
        "soilType": args.soil_type,
        "temperature": args.temperature,
        "humidity": args.humidity,
        "soilMoisture": args.soil_moisture,
        "region": args.region,
    });
    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/crops/recommendations",
        Some(body),
    )
    .await
}
