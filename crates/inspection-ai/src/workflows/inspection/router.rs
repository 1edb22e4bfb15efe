use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{InspectionRecord, Variant, VariantSwitchPolicy};
use super::gateway::ReportGenerator;
use super::report::{GeneratedReport, ReportArtifact, ReportPresenter};
use super::schema::{self, FieldDescriptor, FormSection};
use super::service::{SubmissionError, SubmissionErrorKind, SubmissionOrchestrator};
use super::session::{BearerToken, StaticCredential};
use super::store::InspectionStore;

const ANONYMOUS_SESSION: &str = "";

/// One orchestrator per caller credential so the in-flight guard applies per
/// user session, not per process.
pub struct InspectionSessions<G, S> {
    generator: Arc<G>,
    store: Arc<S>,
    fallback: Option<BearerToken>,
    variant_switch: VariantSwitchPolicy,
    sessions: Mutex<HashMap<String, Arc<SubmissionOrchestrator<G, S>>>>,
}

impl<G, S> InspectionSessions<G, S>
where
    G: ReportGenerator + 'static,
    S: InspectionStore + 'static,
{
    pub fn new(generator: Arc<G>, store: Arc<S>, fallback: Option<BearerToken>) -> Self {
        Self {
            generator,
            store,
            fallback,
            variant_switch: VariantSwitchPolicy::default(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Policy advertised to form clients for variant changes.
    pub fn with_variant_switch(mut self, policy: VariantSwitchPolicy) -> Self {
        self.variant_switch = policy;
        self
    }

    pub fn variant_switch(&self) -> VariantSwitchPolicy {
        self.variant_switch
    }

    /// Orchestrator for a caller; without a credential the fallback key is used.
    pub fn orchestrator(
        &self,
        credential: Option<BearerToken>,
    ) -> Arc<SubmissionOrchestrator<G, S>> {
        let session_key = credential
            .as_ref()
            .map_or(ANONYMOUS_SESSION, |token| token.expose())
            .to_string();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = sessions.get(&session_key) {
            return existing.clone();
        }

        sessions.retain(|_, orchestrator| {
            Arc::strong_count(orchestrator) > 1 || orchestrator.is_busy()
        });

        let token = credential.or_else(|| self.fallback.clone());
        let orchestrator = Arc::new(SubmissionOrchestrator::new(
            self.generator.clone(),
            self.store.clone(),
            Arc::new(StaticCredential::new(token)),
        ));
        sessions.insert(session_key, orchestrator.clone());
        orchestrator
    }
}

/// Router exposing the field schema, submission and download endpoints.
pub fn inspection_router<G, S>(sessions: Arc<InspectionSessions<G, S>>) -> Router
where
    G: ReportGenerator + 'static,
    S: InspectionStore + 'static,
{
    Router::new()
        .route("/api/v1/inspections/schema", get(schema_handler::<G, S>))
        .route(
            "/api/v1/inspections/schema/:variant",
            get(variant_schema_handler),
        )
        .route("/api/v1/inspections", post(submit_handler::<G, S>))
        .route("/api/v1/inspections/download", post(download_handler))
        .with_state(sessions)
}

#[derive(Debug, Serialize)]
pub(crate) struct VariantSchemaView {
    pub(crate) variant: Variant,
    pub(crate) display_name: &'static str,
    pub(crate) fields: &'static [FieldDescriptor],
    pub(crate) sections: Vec<FormSection>,
}

impl VariantSchemaView {
    fn new(variant: Variant) -> Self {
        Self {
            variant,
            display_name: variant.display_name(),
            fields: schema::variant_fields(variant),
            sections: schema::form_sections(variant),
        }
    }
}

pub(crate) async fn schema_handler<G, S>(
    State(sessions): State<Arc<InspectionSessions<G, S>>>,
) -> Response
where
    G: ReportGenerator + 'static,
    S: InspectionStore + 'static,
{
    let variants: Vec<VariantSchemaView> =
        Variant::ALL.into_iter().map(VariantSchemaView::new).collect();
    let payload = json!({
        "common": schema::common_fields(),
        "variants": variants,
        "variant_switch": sessions.variant_switch(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn variant_schema_handler(Path(variant): Path<String>) -> Response {
    match variant.parse::<Variant>() {
        Ok(variant) => (StatusCode::OK, axum::Json(VariantSchemaView::new(variant))).into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionView {
    pub(crate) variant: Variant,
    pub(crate) report: String,
    pub(crate) suggested_filename: String,
}

pub(crate) async fn submit_handler<G, S>(
    State(sessions): State<Arc<InspectionSessions<G, S>>>,
    headers: HeaderMap,
    axum::Json(record): axum::Json<InspectionRecord>,
) -> Response
where
    G: ReportGenerator + 'static,
    S: InspectionStore + 'static,
{
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(BearerToken::from_authorization);
    let orchestrator = sessions.orchestrator(credential);

    match orchestrator.submit(record).await {
        Ok(report) => {
            let artifact = ReportPresenter::present_today(&report);
            let view = SubmissionView {
                variant: report.variant,
                report: report.text,
                suggested_filename: artifact.suggested_filename,
            };
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(err) => submission_error_response(&err),
    }
}

pub(crate) fn submission_error_response(err: &SubmissionError) -> Response {
    let status = match err.kind() {
        Some(SubmissionErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(SubmissionErrorKind::Generation) | Some(SubmissionErrorKind::Persistence) => {
            StatusCode::BAD_GATEWAY
        }
        None => StatusCode::CONFLICT,
    };
    let payload = json!({
        "error": err.to_string(),
        "kind": err.kind(),
    });
    (status, axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadRequest {
    pub(crate) variant: Variant,
    pub(crate) report: String,
    #[serde(default)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) async fn download_handler(axum::Json(request): axum::Json<DownloadRequest>) -> Response {
    let DownloadRequest {
        variant,
        report,
        date,
    } = request;
    let on = date.unwrap_or_else(|| Utc::now().date_naive());
    let artifact = ReportPresenter::present(
        &GeneratedReport {
            text: report,
            variant,
        },
        on,
    );
    attachment_response(artifact)
}

fn attachment_response(artifact: ReportArtifact) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}.txt\"",
        artifact.suggested_filename
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.content,
    )
        .into_response()
}
