use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationStats {
    pub mean: f64,
    pub max: f64,
}

/// Per-image outcome reported by the processing service.
///
/// A failed image is not a failed submission: the archive as a whole still
/// succeeded and the error is carried inline with the other entries.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageResult {
    Success {
        filename: String,
        stats: ActivationStats,
        shape: Option<Vec<u64>>,
        /// Base64-encoded PNG, passed through untouched.
        feature_visualization: Option<String>,
    },
    Error {
        filename: String,
        message: Option<String>,
    },
}

impl ImageResult {
    pub fn filename(&self) -> &str {
        match self {
            ImageResult::Success { filename, .. } | ImageResult::Error { filename, .. } => filename,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ImageResult::Success { .. })
    }
}
