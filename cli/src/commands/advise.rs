use clap::Args;
use serde_json::json;

use crate::util::{api_request, exit_error};

#[derive(Args)]
pub struct AdviseArgs {
    /// Classifier label (e.g. "Tomato___Late_blight")
    #[arg(long)]
    pub label: String,
    /// Classifier confidence in [0, 1]; a percentage such as 91 is rejected
    #[arg(long)]
    pub confidence: f64,
}

fn check_confidence(confidence: f64) -> Result<(), String> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(format!("--confidence must be between 0 and 1, got {confidence}"))
    }
}

pub async fn run(api_url: &str, args: AdviseArgs) -> i32 {
    if let Err(message) = check_confidence(args.confidence) {
        exit_error(&message, Some("Pass the classifier probability, e.g. --confidence 0.91"));
    }
    let body = json!({
        "label": args.label,
        "confidence": args.confidence,
    });
    api_request(api_url, reqwest::Method::POST, "/v1/advice", Some(body)).await
}

#[cfg(test)]
mod tests {
    use super::check_confidence;

    #[test]
    fn confidence_must_be_a_probability() {
        assert!(check_confidence(0.0).is_ok());
        assert!(check_confidence(0.91).is_ok());
        assert!(check_confidence(1.0).is_ok());
        assert!(check_confidence(91.0).is_err());
        assert!(check_confidence(f64::NAN).is_err());
    }
}
