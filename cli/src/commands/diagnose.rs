use std::path::Path;

use base64::Engine;
use clap::Args;
use serde_json::json;

use crate::util::{api_request, exit_error};

#[derive(Args)]
pub struct DiagnoseArgs {
    /// Leaf photo to classify (JPEG, PNG or WebP)
    #[arg(long)]
    pub image: String,
}

fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Base64 image string, as a data URL when the file type is known.
fn encode_image(path: &Path, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    match mime_type(path) {
        Some(mime) => format!("data:{mime};base64,{encoded}"),
        None => encoded,
    }
}

pub async fn run(api_url: &str, args: DiagnoseArgs) -> i32 {
    let path = Path::new(&args.image);
    let bytes = std::fs::read(path).unwrap_or_else(|e| {
        exit_error(
            &format!("Failed to read image '{}': {e}", args.image),
            Some("Pass the path of a leaf photo with --image"),
        )
    });
    if bytes.is_empty() {
        exit_error(&format!("Image '{}' is empty", args.image), None);
    }

    let body = json!({ "image": encode_image(path, &bytes) });
    api_request(api_url, reqwest::Method::POST, "/v1/diagnoses", Some(body)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_become_data_urls() {
        assert_eq!(
            encode_image(Path::new("leaf.JPG"), b"hello"),
            "data:image/jpeg;base64,aGVsbG8="
        );
        assert_eq!(
            encode_image(Path::new("scans/leaf.png"), b"hello"),
            "data:image/png;base64,aGVsbG8="
        );
    }

    #[test]
    fn unknown_extensions_send_plain_base64() {
        assert_eq!(encode_image(Path::new("leaf.bin"), b"hello"), "aGVsbG8=");
        assert_eq!(encode_image(Path::new("leaf"), b"hello"), "aGVsbG8=");
    }
}
