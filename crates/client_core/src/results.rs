use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::ImageResult;
use thiserror::Error;

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";
const SHAPE_SEPARATOR: &str = " × ";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Error)]
pub enum VisualizationError {
    #[error("feature visualization is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("feature visualization is not a PNG image")]
    NotPng,
}

/// Base64 PNG feature map as delivered by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visualization {
    encoded: String,
}

impl Visualization {
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.encoded)
    }

    pub fn decode(&self) -> Result<Vec<u8>, VisualizationError> {
        let bytes = STANDARD.decode(self.encoded.trim())?;
        if !bytes.starts_with(PNG_SIGNATURE) {
            return Err(VisualizationError::NotPng);
        }
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardBody {
    Success {
        visualization: Option<Visualization>,
        mean_activation: String,
        max_activation: String,
        shape: Option<String>,
    },
    Failure {
        message: String,
    },
}

/// Renderable view of one [`ImageResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub filename: String,
    pub body: CardBody,
}

impl ResultCard {
    pub fn is_success(&self) -> bool {
        matches!(self.body, CardBody::Success { .. })
    }
}

impl fmt::Display for ResultCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.filename)?;
        match &self.body {
            CardBody::Success {
                visualization,
                mean_activation,
                max_activation,
                shape,
            } => {
                if visualization.is_some() {
                    writeln!(f, "  Feature Map: attached")?;
                }
                writeln!(f, "  Mean Activation: {mean_activation}")?;
                writeln!(f, "  Max Activation: {max_activation}")?;
                if let Some(shape) = shape {
                    writeln!(f, "  Feature Shape: {shape}")?;
                }
                Ok(())
            }
            CardBody::Failure { message } => writeln!(f, "  Error: {message}"),
        }
    }
}

pub fn project_one(result: &ImageResult) -> ResultCard {
    match result {
        ImageResult::Success {
            filename,
            stats,
            shape,
            feature_visualization,
        } => ResultCard {
            filename: filename.clone(),
            body: CardBody::Success {
                visualization: feature_visualization
                    .as_ref()
                    .filter(|encoded| !encoded.is_empty())
                    .map(|encoded| Visualization {
                        encoded: encoded.clone(),
                    }),
                mean_activation: format!("{:.4}", stats.mean),
                max_activation: format!("{:.4}", stats.max),
                shape: shape.as_ref().map(|dims| {
                    dims.iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join(SHAPE_SEPARATOR)
                }),
            },
        },
        ImageResult::Error { filename, message } => ResultCard {
            filename: filename.clone(),
            body: CardBody::Failure {
                message: message
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(UNKNOWN_ERROR_MESSAGE)
                    .to_string(),
            },
        },
    }
}

/// Maps service results to cards, in order. An empty input projects to an
/// empty list and [`render_text`] renders nothing for it.
pub fn project(results: &[ImageResult]) -> Vec<ResultCard> {
    results.iter().map(project_one).collect()
}

pub fn render_text(results: &[ImageResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }
    let mut out = String::from("Processed Images\n");
    for card in project(results) {
        out.push('\n');
        out.push_str(&card.to_string());
    }
    Some(out)
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
