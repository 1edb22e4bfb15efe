//! Inspection submission pipeline.
//!
//! A record is captured for one of three regulatory variants (API 510 pressure
//! vessels, API 570 piping, API 653 storage tanks), sent to the report generator,
//! reduced to the variant's declared field set and written to the store. The
//! [`schema`] registry is the only place that decides which fields belong to a
//! variant; rendering, validation and normalization all read from it.

pub mod domain;
pub mod form;
pub mod gateway;
pub mod normalizer;
pub mod report;
pub mod router;
pub mod schema;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    ChoiceDomain, ChoiceOption, CoatingCondition, CommonFields, EquipmentType, FieldError,
    FieldValue, InspectionRecord, InsulationCondition, PipingDetails, PressureVesselDetails,
    StorageTankDetails, Variant, VariantDetails, VariantSwitchPolicy,
};
pub use form::{CompletionOutcome, FormError, FormSession, SubmissionTicket};
pub use gateway::{
    interpret_reply, GatewayError, GenerationError, GeneratorBody, GeneratorReply,
    HttpReportGenerator, ReportGenerator,
};
pub use normalizer::{normalize, PersistencePayload, REPORT_KEY, VARIANT_KEY};
pub use report::{
    report_filename, FileExporter, GeneratedReport, ReportArtifact, ReportExporter,
    ReportPresenter,
};
pub use router::{inspection_router, InspectionSessions};
pub use schema::{FieldDescriptor, FieldKey, FormSection, InputKind};
pub use service::{
    SubmissionError, SubmissionErrorKind, SubmissionOrchestrator, SubmissionStage,
    ValidationError,
};
pub use session::{BearerToken, CredentialProvider, StaticCredential};
pub use store::{InspectionStore, PostgrestStore, StoreError, StoredInspection};
