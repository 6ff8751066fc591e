//! API error types
//!
//! Errors carry the HTTP status and the provider error code as explicit
//! fields so callers match on data, never on error type names or message
//! text.

use serde_json::Value;
use thiserror::Error;

/// The provider reports its error code under either of these body keys.
const ERR_CODE_KEYS: [&str; 2] = ["errCode", "error_code"];

#[derive(Error, Debug)]
pub enum ApiError {
    /// 404 on a by-id lookup. Kept distinct because the delete paths map
    /// it to a terminal "deleted" status instead of failing.
    #[error("resource not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx response, with the provider error code extracted
    /// from the structured body when one is present.
    #[error("unexpected response code {status} from {url}: [{}] {message}", .code.as_deref().unwrap_or("-"))]
    Response {
        status: u16,
        url: String,
        code: Option<String>,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Build a [`ApiError::Response`] from a raw error body.
    pub(crate) fn from_response(status: u16, url: &str, body: &[u8]) -> Self {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();
        let code = parsed.as_ref().and_then(extract_error_code);
        let message = parsed
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

        ApiError::Response {
            status,
            url: url.to_string(),
            code,
            message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Whether this is an "another operation is already in progress"
    /// conflict: a 409 or 403 whose provider error code is in `codes`.
    /// Only those two statuses carry inspectable conflict bodies.
    pub fn is_transient_conflict(&self, codes: &[&str]) -> bool {
        match self {
            ApiError::Response {
                status: 409 | 403,
                code: Some(code),
                ..
            } => codes.contains(&code.as_str()),
            _ => false,
        }
    }
}

fn extract_error_code(body: &Value) -> Option<String> {
    ERR_CODE_KEYS
        .iter()
        .find_map(|key| body.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_error_message(body: &Value) -> Option<String> {
    ["error_msg", "message"]
        .iter()
        .find_map(|key| body.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub type Result<T> = std::result::Result<T, ApiError>;
