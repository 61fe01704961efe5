// Submission state machine: idle -> fetching -> generating -> success.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::code::is_valid_code;
use crate::participants::{LookupError, Participant};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Idle,
    Fetching,
    Generating,
    Success,
}

impl FlowStatus {
    pub fn accepts_submission(self) -> bool {
        matches!(self, FlowStatus::Idle | FlowStatus::Success)
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid code. Enter 5 digits followed by the matching checksum letter (e.g., 12345P).")]
    InvalidCode,
    #[error("A certificate request for this code is already in progress.")]
    InProgress,
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("You are not eligible for a certificate yet. Please complete the marathon.")]
    NotEligible,
    #[error("Failed to process your request. Please try again.")]
    Generation,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub code: String,
    pub status: FlowStatus,
    pub message: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Entry {
    status: FlowStatus,
    message: Option<String>,
    updated_at: DateTime<Utc>,
}

/// A generated certificate ready to be handed out as a download.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub participant: Participant,
    pub pdf: Vec<u8>,
}

impl Certificate {
    pub fn file_name(&self) -> String {
        format!("Certificate-{}.pdf", self.participant.name)
    }
}

/// Settled statuses older than this are dropped when a new submission begins.
const STATUS_RETENTION_HOURS: i64 = 1;

/// Per-code submission status. Lock is never held across an await.
#[derive(Default)]
pub struct Submissions {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Submissions {
    // A panic elsewhere cannot leave an entry half-written, so a poisoned map is still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Submission status lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    pub fn status(&self, code: &str) -> StatusReport {
        let entry = self.entries().get(code).cloned();
        match entry {
            Some(entry) => StatusReport {
                code: code.to_string(),
                status: entry.status,
                message: entry.message,
                updated_at: Some(entry.updated_at),
            },
            None => StatusReport {
                code: code.to_string(),
                status: FlowStatus::Idle,
                message: None,
                updated_at: None,
            },
        }
    }

    fn set(&self, code: &str, status: FlowStatus, message: Option<String>) {
        self.entries().insert(
            code.to_string(),
            Entry {
                status,
                message,
                updated_at: Utc::now(),
            },
        );
    }

    /// Moves `code` into `fetching` unless a request for it is already running.
    pub fn begin(&self, code: &str) -> Result<FlowGuard<'_>, SubmitError> {
        let mut entries = self.entries();
        let cutoff = Utc::now() - chrono::Duration::hours(STATUS_RETENTION_HOURS);
        entries.retain(|_, entry| !entry.status.accepts_submission() || entry.updated_at > cutoff);

        if let Some(entry) = entries.get(code) {
            if !entry.status.accepts_submission() {
                return Err(SubmitError::InProgress);
            }
        }
        entries.insert(
            code.to_string(),
            Entry {
                status: FlowStatus::Fetching,
                message: None,
                updated_at: Utc::now(),
            },
        );
        Ok(FlowGuard {
            submissions: self,
            code: code.to_string(),
            finished: false,
        })
    }
}

/// Holds a code in flight. Dropping it unfinished returns the code to idle.
pub struct FlowGuard<'a> {
    submissions: &'a Submissions,
    code: String,
    finished: bool,
}

impl FlowGuard<'_> {
    pub fn advance(&self, status: FlowStatus) {
        self.submissions.set(&self.code, status, None);
    }

    pub fn succeed(mut self) {
        self.finished = true;
        self.submissions.set(&self.code, FlowStatus::Success, None);
    }

    pub fn fail(mut self, err: &SubmitError) {
        self.finished = true;
        self.submissions
            .set(&self.code, FlowStatus::Idle, Some(err.to_string()));
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Submission for {} abandoned mid-flight", self.code);
            self.submissions.set(&self.code, FlowStatus::Idle, None);
        }
    }
}

/// Runs one submission: validate, look up, generate.
pub async fn submit(state: &AppState, code: &str) -> Result<Certificate, SubmitError> {
    if !is_valid_code(code) {
        info!("Rejected malformed code {:?}", code);
        return Err(SubmitError::InvalidCode);
    }

    let guard = state.submissions.begin(code)?;
    let span = tracing::info_span!("submission", id = %Uuid::new_v4(), code = %code);

    let result = run(state, code, &guard).instrument(span).await;
    match result {
        Ok(certificate) => {
            guard.succeed();
            Ok(certificate)
        }
        Err(e) => {
            guard.fail(&e);
            Err(e)
        }
    }
}

async fn run(state: &AppState, code: &str, guard: &FlowGuard<'_>) -> Result<Certificate, SubmitError> {
    let participant = state.participants.find(code).await.map_err(|e| {
        warn!("Lookup failed: {:?}", e);
        SubmitError::from(e)
    })?;

    if !participant.is_crossed {
        info!("Participant {} has not crossed the finish line", participant.unique_code);
        return Err(SubmitError::NotEligible);
    }

    guard.advance(FlowStatus::Generating);

    let background = state.background.get().await.map_err(|e| {
        error!("Certificate background unavailable: {}", e);
        SubmitError::Generation
    })?;

    let font = state.font.clone();
    let name = participant.name.clone();
    let pdf = tokio::task::spawn_blocking(move || {
        crate::pdf::render_certificate(&name, &background, font.as_deref())
    })
    .await
    .map_err(|e| {
        error!("Certificate task failed: {}", e);
        SubmitError::Generation
    })?
    .ok_or(SubmitError::Generation)?;

    info!("Certificate ready for {}", participant.name);
    Ok(Certificate { participant, pdf })
}
