use chrono::NaiveDate;
use inspection_ai::config::AppConfig;
use inspection_ai::error::AppError;
use inspection_ai::workflows::inspection::{
    BearerToken, HttpReportGenerator, InspectionSessions, PostgrestStore, StaticCredential,
    SubmissionOrchestrator, Variant,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// HTTP adapters for the configured backend, shared by every session.
pub(crate) struct BackendClients {
    pub(crate) generator: Arc<HttpReportGenerator>,
    pub(crate) store: Arc<PostgrestStore>,
    pub(crate) service_credential: Option<BearerToken>,
}

impl BackendClients {
    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let backend = config.backend()?;
        let generator =
            HttpReportGenerator::new(backend.generator_url.clone(), config.request_timeout)?;
        let store = PostgrestStore::new(
            backend.supabase_url.clone(),
            backend.reports_table.clone(),
            backend.anon_key.clone(),
            config.request_timeout,
        )?;

        Ok(Self {
            generator: Arc::new(generator),
            store: Arc::new(store),
            service_credential: BearerToken::new(backend.anon_key.clone()),
        })
    }

    pub(crate) fn sessions(self) -> InspectionSessions<HttpReportGenerator, PostgrestStore> {
        InspectionSessions::new(self.generator, self.store, self.service_credential)
    }

    pub(crate) fn orchestrator(self) -> SubmissionOrchestrator<HttpReportGenerator, PostgrestStore> {
        SubmissionOrchestrator::new(
            self.generator,
            self.store,
            Arc::new(StaticCredential::new(self.service_credential)),
        )
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_variant(raw: &str) -> Result<Variant, String> {
    raw.parse::<Variant>().map_err(|err| err.to_string())
}
