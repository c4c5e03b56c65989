use reqwest::Client;

pub mod config;
pub mod credential_store;
pub mod error;
pub mod identity;
pub mod intake;
pub mod results;
pub mod routing;
pub mod session;
pub mod upload;

pub use config::{load_settings, ClientSettings};
pub use credential_store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{AuthError, ClientError, ErrorCategory, TransportError, ValidationError};
pub use identity::{Credentials, HttpIdentityProvider, IdentityProvider};
pub use intake::{CandidateFile, IntakeOutcome, UploadDropZone};
pub use results::{CardBody, ResultCard};
pub use routing::{Navigation, Route};
pub use session::{Identity, Session, SessionGuard};
pub use upload::{UploadOrchestrator, UploadSession, UploadState};

/// HTTP client shared by the identity provider and the orchestrator. The
/// configured timeout bounds every request; there are no retries.
pub fn build_http_client(settings: &ClientSettings) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(settings.request_timeout())
        .build()
        .map_err(|e| ClientError::Transport(TransportError::from(e)))
}
