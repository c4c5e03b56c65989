use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{ActivationStats, ImageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// One entry of the `results` array exactly as the service sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResultPayload {
    pub filename: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_activation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_activation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_visualization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ImageResultPayload> for ImageResult {
    fn from(payload: ImageResultPayload) -> Self {
        if payload.status != ResultStatus::Success {
            return ImageResult::Error {
                filename: payload.filename,
                message: payload.error,
            };
        }

        match (payload.mean_activation, payload.max_activation) {
            (Some(mean), Some(max)) => ImageResult::Success {
                filename: payload.filename,
                stats: ActivationStats { mean, max },
                shape: payload.shape,
                feature_visualization: payload.feature_visualization,
            },
            (mean, _) => {
                let missing = if mean.is_none() {
                    "mean_activation"
                } else {
                    "max_activation"
                };
                ImageResult::Error {
                    filename: payload.filename,
                    message: Some(format!("malformed success result: missing {missing}")),
                }
            }
        }
    }
}

/// Success body of `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub images_processed: Option<u64>,
    /// Required key; an explicit `null` reads as an empty list.
    #[serde(deserialize_with = "nullable_list")]
    pub results: Vec<ImageResultPayload>,
}

impl UploadResponse {
    pub fn processed_count(&self) -> u64 {
        self.images_processed.unwrap_or(self.results.len() as u64)
    }
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
