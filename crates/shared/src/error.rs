use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error body shape used by the service (`{"detail": ...}`).
///
/// `detail` is usually a string, but request validation failures carry a
/// list of `{ "msg": ... }` objects instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ServiceErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::Null => None,
            Value::String(text) if text.trim().is_empty() => None,
            Value::String(text) => Some(text.clone()),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item.get("msg").and_then(Value::as_str) {
                        Some(msg) => msg.to_string(),
                        None => item.to_string(),
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("HTTP {status}: {message}")]
pub struct ServiceError {
    pub status: u16,
    pub message: String,
}

impl ServiceError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Builds an error from a raw response body, falling back to `fallback`
    /// when the body is not a recognizable error document.
    pub fn from_body(status: u16, body: &[u8], fallback: &str) -> Self {
        let message = serde_json::from_slice::<ServiceErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message())
            .unwrap_or_else(|| fallback.to_string());
        Self { status, message }
    }
}
