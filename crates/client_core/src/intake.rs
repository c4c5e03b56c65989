use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ValidationError, ZIP_REQUIRED_MESSAGE};

/// Media types that identify a zip archive. Matching is exact.
pub const ZIP_MEDIA_TYPES: [&str; 2] = ["application/zip", "application/x-zip-compressed"];

const EMPTY_PROMPT: &str = "Drop your ZIP file here";
const BROWSE_HINT: &str = "or click to browse (ZIP files only)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHandle {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub handle: FileHandle,
}

impl CandidateFile {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            byte_size: bytes.len() as u64,
            mime_type: mime_type.into(),
            handle: FileHandle::Bytes(bytes),
        }
    }

    /// Describes a file on disk, taking its media type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            name,
            byte_size: metadata.len(),
            mime_type,
            handle: FileHandle::Path(path.to_path_buf()),
        })
    }

    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.byte_size as f64 / 1024.0 / 1024.0)
    }
}

pub fn is_zip_media_type(mime_type: &str) -> bool {
    ZIP_MEDIA_TYPES.contains(&mime_type)
}

pub fn validate(candidate: &CandidateFile) -> Result<(), ValidationError> {
    if is_zip_media_type(&candidate.mime_type) {
        Ok(())
    } else {
        Err(ValidationError::NotZip {
            mime_type: candidate.mime_type.clone(),
        })
    }
}

/// Result of handing a file to the drop zone.
///
/// `Accepted` is the submission trigger: each accepted call yields exactly
/// one, and the caller is expected to submit it.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Accepted(CandidateFile),
    Rejected(ValidationError),
    Ignored,
}

/// Drag/drop and browse state for the single-archive picker.
#[derive(Debug, Default)]
pub struct UploadDropZone {
    is_dragging: bool,
    candidate: Option<CandidateFile>,
    error: Option<ValidationError>,
    input_generation: u64,
}

impl UploadDropZone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn candidate(&self) -> Option<&CandidateFile> {
        self.candidate.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Bumped whenever the file input is reset, so a re-selection of the same
    /// file is seen as a new selection.
    pub fn input_generation(&self) -> u64 {
        self.input_generation
    }

    pub fn drag_enter(&mut self) {
        self.is_dragging = true;
    }

    pub fn drag_leave(&mut self) {
        self.is_dragging = false;
    }

    pub fn drag_over(&mut self) {}

    pub fn drop(&mut self, files: Vec<CandidateFile>) -> IntakeOutcome {
        self.is_dragging = false;
        self.error = None;
        match files.into_iter().next() {
            Some(first) => self.validate_and_set(first),
            None => IntakeOutcome::Ignored,
        }
    }

    pub fn select(&mut self, files: Vec<CandidateFile>) -> IntakeOutcome {
        match files.into_iter().next() {
            Some(first) => self.validate_and_set(first),
            None => IntakeOutcome::Ignored,
        }
    }

    pub fn validate_and_set(&mut self, candidate: CandidateFile) -> IntakeOutcome {
        match validate(&candidate) {
            Ok(()) => {
                info!(
                    name = %candidate.name,
                    size = %candidate.size_label(),
                    "intake: archive accepted"
                );
                self.error = None;
                self.candidate = Some(candidate.clone());
                IntakeOutcome::Accepted(candidate)
            }
            Err(err) => {
                debug!(name = %candidate.name, mime_type = %candidate.mime_type, "intake: rejected");
                self.candidate = None;
                self.error = Some(err.clone());
                IntakeOutcome::Rejected(err)
            }
        }
    }

    pub fn remove(&mut self) {
        self.candidate = None;
        self.error = None;
        self.input_generation += 1;
    }

    pub fn prompt(&self) -> &str {
        match &self.candidate {
            Some(candidate) => &candidate.name,
            None => EMPTY_PROMPT,
        }
    }

    pub fn hint(&self) -> &str {
        match &self.error {
            Some(_) => ZIP_REQUIRED_MESSAGE,
            None => BROWSE_HINT,
        }
    }
}

#[cfg(test)]
#[path = "tests/intake_tests.rs"]
mod tests;
