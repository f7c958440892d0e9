use clap::Args;
use serde_json::json;

use crate::util::{api_request, exit_error, read_json_from_file};

#[derive(Args)]
pub struct ChatArgs {
    /// Question for the farm assistant
    #[arg(long)]
    pub message: String,
    /// Earlier turns as a JSON array of {role, content} (use '-' for stdin)
    #[arg(long)]
    pub history_file: Option<String>,
    /// Current readings as JSON, e.g. '{"temperature":31,"humidity":70,"soilMoisture":22}'
    #[arg(long)]
    pub sensors: Option<String>,
}

fn parse_history(value: serde_json::Value) -> Result<serde_json::Value, String> {
    let turns = value
        .as_array()
        .ok_or_else(|| "history must be a JSON array".to_string())?;
    for (idx, turn) in turns.iter().enumerate() {
        let role = turn.get("role").and_then(|r| r.as_str());
        if !matches!(role, Some("user") | Some("assistant")) {
            return Err(format!("history[{idx}].role must be \"user\" or \"assistant\""));
        }
        if turn.get("content").and_then(|c| c.as_str()).is_none() {
            return Err(format!("history[{idx}].content must be a string"));
        }
    }
    Ok(value)
}

pub async fn run(api_url: &str, args: ChatArgs) -> i32 {
    let mut body = json!({ "message": args.message });

    if let Some(path) = args.history_file.as_deref() {
        let history = read_json_from_file(path)
            .and_then(parse_history)
            .unwrap_or_else(|e| exit_error(&e, Some("Provide a JSON array of {role, content} turns")));
        body["history"] = history;
    }
    if let Some(raw) = args.sensors.as_deref() {
        let sensors: serde_json::Value = serde_json::from_str(raw).unwrap_or_else(|e| {
            exit_error(
                &format!("Invalid JSON in --sensors: {e}"),
                Some("Provide valid JSON for --sensors"),
            )
        });
        body["sensors"] = sensors;
    }

    api_request(api_url, reqwest::Method::POST, "/v1/chat", Some(body)).await
}

#[cfg(test)]
mod tests {
    use super::parse_history;
    use serde_json::json;

    #[test]
    fn parse_history_accepts_user_and_assistant_turns() {
        let history = json!([
            {"role": "user", "content": "Hi"},
            {"role": "assistant", "content": "Hello"}
        ]);
        assert_eq!(parse_history(history.clone()), Ok(history));
    }

    #[test]
    fn parse_history_rejects_unknown_roles() {
        let err = parse_history(json!([{"role": "system", "content": "x"}]))
            .expect_err("system role must fail");
        assert!(err.contains("history[0].role"));
        assert!(parse_history(json!({"role": "user"})).is_err());
    }
}
