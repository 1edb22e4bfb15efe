use chrono::NaiveDate;

use super::domain::{FieldError, InspectionRecord, Variant, VariantSwitchPolicy};
use super::report::{GeneratedReport, ReportArtifact, ReportPresenter};
use super::schema::{self, FieldKey, FormSection};
use super::service::SubmissionError;

/// Handle for a submission started from a form. Carries the form generation it
/// was issued for so late results can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    /// The form was discarded after the submission began; the result was dropped.
    Stale,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("a submission is already pending for this form")]
    SubmissionPending,
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Interactive state behind the inspection form: the record being edited, the
/// last report or error shown, and whether a submission is pending.
#[derive(Debug, Clone)]
pub struct FormSession {
    record: InspectionRecord,
    policy: VariantSwitchPolicy,
    generation: u64,
    pending: bool,
    report: Option<GeneratedReport>,
    error: Option<String>,
}

impl FormSession {
    pub fn new(policy: VariantSwitchPolicy) -> Self {
        Self {
            record: InspectionRecord::default(),
            policy,
            generation: 0,
            pending: false,
            report: None,
            error: None,
        }
    }

    pub fn record(&self) -> &InspectionRecord {
        &self.record
    }

    pub fn sections(&self) -> Vec<FormSection> {
        schema::form_sections(self.record.variant())
    }

    /// Applies a change event by wire field name; `inspectionType` switches variant.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), FormError> {
        if name == "inspectionType" {
            let variant: Variant = value.parse()?;
            self.switch_variant(variant);
            return Ok(());
        }
        let key =
            FieldKey::from_wire(name).ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        self.record.set_field(key, value)?;
        Ok(())
    }

    pub fn switch_variant(&mut self, variant: Variant) {
        self.record.switch_variant(variant, self.policy);
    }

    /// Snapshots the record for submission. Clears the previous report and error.
    pub fn begin_submission(&mut self) -> Result<(SubmissionTicket, InspectionRecord), FormError> {
        if self.pending {
            return Err(FormError::SubmissionPending);
        }
        self.pending = true;
        self.report = None;
        self.error = None;
        Ok((
            SubmissionTicket {
                generation: self.generation,
            },
            self.record.clone(),
        ))
    }

    /// Applies a finished submission. Form data is kept either way so a failed
    /// submission can be retried without re-entry.
    pub fn complete(
        &mut self,
        ticket: SubmissionTicket,
        result: Result<GeneratedReport, SubmissionError>,
    ) -> CompletionOutcome {
        if ticket.generation != self.generation {
            return CompletionOutcome::Stale;
        }

        self.pending = false;
        match result {
            Ok(report) => {
                self.report = Some(report);
                self.error = None;
            }
            Err(err) => {
                self.report = None;
                self.error = Some(err.to_string());
            }
        }
        CompletionOutcome::Applied
    }

    /// Abandons the form (navigation away). Any in-flight result becomes stale.
    pub fn discard(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.record = InspectionRecord::default();
        self.pending = false;
        self.report = None;
        self.error = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn report(&self) -> Option<&GeneratedReport> {
        self.report.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn download(&self, on: NaiveDate) -> Option<ReportArtifact> {
        self.report
            .as_ref()
            .map(|report| ReportPresenter::present(report, on))
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new(VariantSwitchPolicy::default())
    }
}
