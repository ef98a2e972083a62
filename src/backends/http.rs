use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::blocking::Response;

use crate::retry::AttemptError;
use crate::{Error, Result};

/// Read a photo and base64-encode it for a JSON request body.
pub(super) fn encode_image(image_path: &Path) -> Result<String> {
    let bytes = std::fs::read(image_path)
        .map_err(|e| Error::msg(format!("failed to read image '{}': {e}", image_path.display())))?;
    Ok(STANDARD.encode(bytes))
}

/// MIME type for a data URL, from the file extension.
pub(super) fn mime_type(image_path: &Path) -> &'static str {
    match image_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Pass successful responses through; turn everything else into an attempt error.
pub(super) fn check_status(resp: Response) -> std::result::Result<Response, AttemptError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().unwrap_or_default();
    Err(classify_failure(status, body))
}

/// Servers backed by llama.cpp report a full slot pool with this message instead of a 429.
const NO_SLOTS: &str = "No slots available";

/// 429 (or a full slot pool) is retried; every other failure status is fatal.
pub(super) fn classify_failure(status: StatusCode, body: String) -> AttemptError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains(NO_SLOTS) {
        AttemptError::RateLimited(body)
    } else {
        AttemptError::Fatal(Error::Backend {
            status: status.as_u16(),
            body,
        })
    }
}
