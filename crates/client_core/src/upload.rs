use reqwest::{
    header::AUTHORIZATION,
    multipart::{Form, Part},
    Body, Client,
};
use shared::{domain::ImageResult, protocol::UploadResponse};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ClientError, TransportError},
    intake::{CandidateFile, FileHandle},
    session::SessionGuard,
};

pub const PROCESSING_MESSAGE: &str = "Processing...";
pub const UPLOAD_FIELD: &str = "file";
const ERROR_PREFIX: &str = "Error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Processing,
    Succeeded,
    Failed,
}

/// Observable state of the current submit-to-result cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    state: UploadState,
    status_message: Option<String>,
    results: Vec<ImageResult>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self {
            state: UploadState::Idle,
            status_message: None,
            results: Vec::new(),
        }
    }
}

impl UploadSession {
    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Last terminal results, which may belong to an earlier submission
    /// while a new one is processing. Prefer [`Self::visible_results`].
    pub fn results(&self) -> &[ImageResult] {
        &self.results
    }

    pub fn visible_results(&self) -> &[ImageResult] {
        match self.state {
            UploadState::Processing => &[],
            _ => &self.results,
        }
    }

    pub fn is_error_status(&self) -> bool {
        self.status_message
            .as_deref()
            .is_some_and(|m| m.starts_with(ERROR_PREFIX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionId(u64);

#[derive(Debug, Clone)]
pub struct Submission {
    id: SubmissionId,
    file: CandidateFile,
}

impl Submission {
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn file(&self) -> &CandidateFile {
        &self.file
    }
}

pub type UploadOutcome = Result<UploadResponse, TransportError>;

fn failure_message(err: &TransportError) -> String {
    match err {
        TransportError::Status { status: 401, .. } => {
            format!("{ERROR_PREFIX}session expired or credential rejected; please log in again (HTTP 401)")
        }
        TransportError::MalformedBody(_) => {
            format!("{ERROR_PREFIX}could not parse the service response")
        }
        other => format!("{ERROR_PREFIX}{other}"),
    }
}

/// Builds the multipart part for `file`. Archives on disk are streamed with
/// the length taken from the opened file.
async fn file_part(file: &CandidateFile) -> Result<Part, TransportError> {
    let part = match &file.handle {
        FileHandle::Bytes(bytes) => Part::bytes(bytes.clone()),
        FileHandle::Path(path) => {
            let read_error = |source| TransportError::ReadFile {
                path: path.clone(),
                source,
            };
            let opened = tokio::fs::File::open(path).await.map_err(read_error)?;
            let length = opened.metadata().await.map_err(read_error)?.len();
            Part::stream_with_length(Body::from(opened), length)
        }
    };
    Ok(part.file_name(file.name.clone()).mime_str(&file.mime_type)?)
}

/// Drives one upload at a time from submission to a terminal state.
pub struct UploadOrchestrator {
    http: Client,
    upload_url: Url,
    session: UploadSession,
    next_id: u64,
    in_flight: Option<SubmissionId>,
}

impl UploadOrchestrator {
    pub fn new(http: Client, upload_url: Url) -> Self {
        Self {
            http,
            upload_url,
            session: UploadSession::default(),
            next_id: 0,
            in_flight: None,
        }
    }

    pub fn from_settings(http: Client, settings: &ClientSettings) -> Result<Self, ClientError> {
        Ok(Self::new(http, settings.upload_url()?))
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn in_flight(&self) -> Option<SubmissionId> {
        self.in_flight
    }

    /// Enters Processing for `file`. Results of the previous submission are
    /// kept until this one reaches a terminal state.
    pub fn begin(&mut self, file: CandidateFile) -> Result<Submission, ClientError> {
        if let Some(current) = self.in_flight {
            warn!(?current, name = %file.name, "upload: rejected submission while another is processing");
            return Err(ClientError::Busy);
        }

        self.next_id += 1;
        let id = SubmissionId(self.next_id);
        self.in_flight = Some(id);
        self.session.state = UploadState::Processing;
        self.session.status_message = Some(PROCESSING_MESSAGE.to_string());
        info!(?id, name = %file.name, size = %file.size_label(), "upload: submission started");
        Ok(Submission { id, file })
    }

    /// Sends the archive. This is the only suspension point of a submission;
    /// non-success statuses are returned without reading the body.
    pub async fn dispatch(&self, submission: &Submission, bearer: Option<&str>) -> UploadOutcome {
        let form = Form::new().part(UPLOAD_FIELD, file_part(&submission.file).await?);

        let mut request = self.http.post(self.upload_url.clone()).multipart(form);
        match bearer {
            Some(token) => request = request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => warn!(id = ?submission.id, "upload: sending without a session credential"),
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::from_status(status));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<UploadResponse>(&body)
            .map_err(|e| TransportError::MalformedBody(e.to_string()))
    }

    /// Applies `outcome` if `id` is still the submission in flight. Returns
    /// whether the outcome was applied.
    pub fn finish(&mut self, id: SubmissionId, outcome: UploadOutcome) -> bool {
        if self.in_flight != Some(id) {
            debug!(?id, "upload: discarding outcome of abandoned submission");
            return false;
        }
        self.in_flight = None;

        match outcome {
            Ok(response) => {
                let count = response.processed_count();
                self.session.results = response
                    .results
                    .into_iter()
                    .map(ImageResult::from)
                    .collect();
                self.session.state = UploadState::Succeeded;
                self.session.status_message = Some(format!("Successfully processed {count} images"));
                info!(?id, count, "upload: succeeded");
            }
            Err(err) => {
                warn!(?id, "upload: failed: {err}");
                self.session.results.clear();
                self.session.state = UploadState::Failed;
                self.session.status_message = Some(failure_message(&err));
            }
        }
        true
    }

    /// Forgets the submission in flight, if any. Its outcome will be ignored.
    pub fn abandon(&mut self) {
        if let Some(id) = self.in_flight.take() {
            info!(?id, "upload: submission abandoned");
            self.session = UploadSession::default();
        }
    }

    /// Runs a whole submission with the session's credential. Service and
    /// network failures end in [`UploadState::Failed`] rather than an `Err`;
    /// a 401 additionally invalidates the session.
    ///
    /// Dropping the returned future before it completes abandons the
    /// submission, leaving the orchestrator idle.
    pub async fn submit(
        &mut self,
        guard: &mut SessionGuard,
        file: CandidateFile,
    ) -> Result<&UploadSession, ClientError> {
        let submission = self.begin(file)?;
        if !guard.is_authenticated() {
            warn!(id = ?submission.id, "upload: submitting without an authenticated session");
        }

        {
            let mut pending = PendingSubmission {
                orchestrator: &mut *self,
                id: submission.id,
            };
            let outcome = pending.orchestrator.dispatch(&submission, guard.bearer()).await;
            if matches!(&outcome, Err(err) if err.is_unauthorized()) {
                guard.invalidate();
            }
            pending.orchestrator.finish(submission.id, outcome);
        }
        Ok(&self.session)
    }
}

/// Abandons its submission on drop unless it already reached a terminal
/// state.
struct PendingSubmission<'a> {
    orchestrator: &'a mut UploadOrchestrator,
    id: SubmissionId,
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if self.orchestrator.in_flight == Some(self.id) {
            self.orchestrator.abandon();
        }
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
