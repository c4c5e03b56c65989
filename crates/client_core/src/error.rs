use std::path::PathBuf;

use thiserror::Error;

pub const ZIP_REQUIRED_MESSAGE: &str = "Please upload a ZIP file containing images";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{}", ZIP_REQUIRED_MESSAGE)]
    NotZip { mime_type: String },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("username and password are required")]
    MissingCredentials,
    #[error("session expired or credential rejected; please log in again")]
    CredentialRejected,
    #[error("not logged in")]
    NotAuthenticated,
    #[error("identity service unavailable: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network failure: {0}")]
    Network(String),
    #[error("service responded with HTTP {status}{}", reason_suffix(.reason))]
    Status { status: u16, reason: Option<String> },
    #[error("could not parse the service response: {0}")]
    MalformedBody(String),
    #[error("could not read '{}': {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(" {reason}"),
        None => String::new(),
    }
}

impl TransportError {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Status { status: 401, .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::MalformedBody(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::from_status(status)
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store io failure at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("credential store encoding failure: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("an upload is already in progress")]
    Busy,
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Auth,
    Transport,
    Storage,
    Busy,
    Config,
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Validation(_) => ErrorCategory::Validation,
            ClientError::Auth(AuthError::Transport(_)) => ErrorCategory::Transport,
            ClientError::Auth(_) => ErrorCategory::Auth,
            ClientError::Transport(err) if err.is_unauthorized() => ErrorCategory::Auth,
            ClientError::Transport(_) => ErrorCategory::Transport,
            ClientError::Store(_) => ErrorCategory::Storage,
            ClientError::Busy => ErrorCategory::Busy,
            ClientError::Config(_) => ErrorCategory::Config,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category() == ErrorCategory::Auth
    }
}
