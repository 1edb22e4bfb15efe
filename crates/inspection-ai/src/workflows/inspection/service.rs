use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{InspectionRecord, Variant};
use super::gateway::{interpret_reply, GenerationError, ReportGenerator};
use super::normalizer::normalize;
use super::report::GeneratedReport;
use super::schema::{self, FieldKey};
use super::session::CredentialProvider;
use super::store::{InspectionStore, StoreError};

/// Stage of the current (or last) submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "kind", rename_all = "snake_case")]
pub enum SubmissionStage {
    Idle,
    Validating,
    Generating,
    Normalizing,
    Persisting,
    Done,
    Failed(SubmissionErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionErrorKind {
    Validation,
    Generation,
    Persistence,
}

/// Mandatory attributes left empty at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub variant: Variant,
    pub missing: Vec<FieldKey>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self
            .missing
            .iter()
            .map(|key| schema::descriptor(*key).map_or(key.wire_name(), |d| d.label))
            .collect();
        write!(
            f,
            "{} inspection is missing required fields: {}",
            self.variant,
            labels.join(", ")
        )
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("failed to save inspection report: {0}")]
    Persistence(#[from] StoreError),
    #[error("a submission is already in progress for this session")]
    InFlight,
}

impl SubmissionError {
    /// Terminal failure kind. `None` for a refused concurrent submission.
    pub fn kind(&self) -> Option<SubmissionErrorKind> {
        match self {
            SubmissionError::Validation(_) => Some(SubmissionErrorKind::Validation),
            SubmissionError::Generation(_) => Some(SubmissionErrorKind::Generation),
            SubmissionError::Persistence(_) => Some(SubmissionErrorKind::Persistence),
            SubmissionError::InFlight => None,
        }
    }
}

/// Drives one session's submissions: validate, generate, normalize, persist.
///
/// At most one submission is in flight per orchestrator; a second call while
/// one is pending is refused with [`SubmissionError::InFlight`]. Dropping the
/// `submit` future abandons the submission and returns the orchestrator to
/// [`SubmissionStage::Idle`].
pub struct SubmissionOrchestrator<G, S> {
    generator: Arc<G>,
    store: Arc<S>,
    credentials: Arc<dyn CredentialProvider>,
    stage: Mutex<SubmissionStage>,
    in_flight: AtomicBool,
}

impl<G, S> SubmissionOrchestrator<G, S>
where
    G: ReportGenerator + 'static,
    S: InspectionStore + 'static,
{
    pub fn new(
        generator: Arc<G>,
        store: Arc<S>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            generator,
            store,
            credentials,
            stage: Mutex::new(SubmissionStage::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn stage(&self) -> SubmissionStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit a completed record, returning the generated report once it is stored.
    pub async fn submit(
        &self,
        record: InspectionRecord,
    ) -> Result<GeneratedReport, SubmissionError> {
        let mut guard = self.acquire()?;
        let variant = record.variant();

        let outcome = self.run(record).await;
        match &outcome {
            Ok(_) => {
                self.advance(SubmissionStage::Done);
                info!(%variant, "inspection report generated and stored");
            }
            Err(err) => {
                if let Some(kind) = err.kind() {
                    self.advance(SubmissionStage::Failed(kind));
                }
                warn!(%variant, error = %err, "inspection submission failed");
            }
        }

        guard.finish();
        outcome
    }

    async fn run(&self, record: InspectionRecord) -> Result<GeneratedReport, SubmissionError> {
        self.advance(SubmissionStage::Validating);
        validate(&record)?;

        self.advance(SubmissionStage::Generating);
        let credential = self.credentials.bearer_token();
        let reply = self
            .generator
            .generate(&record, credential.as_ref())
            .await
            .map_err(GenerationError::from)?;
        let status = reply.status;
        let report_text = interpret_reply(reply).map_err(|err| {
            warn!(status, error = %err, "report generator did not return a report");
            err
        })?;

        self.advance(SubmissionStage::Normalizing);
        let payload = normalize(&record, &report_text);
        debug!(payload = %payload.to_json(), "normalized persistence payload");

        self.advance(SubmissionStage::Persisting);
        let stored = self
            .store
            .insert(&payload, credential.as_ref())
            .await
            .map_err(|err| {
                warn!(
                    message = %err.message,
                    detail = err.detail.as_deref().unwrap_or(""),
                    hint = err.hint.as_deref().unwrap_or(""),
                    code = err.code.as_deref().unwrap_or(""),
                    "store rejected inspection payload; generated report discarded"
                );
                err
            })?;
        debug!(id = ?stored.id(), "inspection row stored");

        Ok(GeneratedReport {
            text: report_text,
            variant: record.variant(),
        })
    }

    fn acquire(&self) -> Result<InFlightGuard<'_>, SubmissionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SubmissionError::InFlight)?;
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            stage: &self.stage,
            finished: false,
        })
    }

    fn advance(&self, next: SubmissionStage) {
        let mut stage = self.stage.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *stage;
        debug!(from = ?previous, to = ?next, "submission stage");
        *stage = next;
    }
}

/// Rejects records with any declared attribute left empty.
pub fn validate(record: &InspectionRecord) -> Result<(), ValidationError> {
    let missing = record.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            variant: record.variant(),
            missing,
        })
    }
}

struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
    stage: &'a Mutex<SubmissionStage>,
    finished: bool,
}

impl InFlightGuard<'_> {
    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = SubmissionStage::Idle;
        }
        self.in_flight.store(false, Ordering::Release);
    }
}
