use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::inspection::gateway::{GatewayError, GeneratorReply, ReportGenerator};
use crate::workflows::inspection::normalizer::PersistencePayload;
use crate::workflows::inspection::schema::{self, InputKind};
use crate::workflows::inspection::session::{BearerToken, StaticCredential};
use crate::workflows::inspection::store::{InspectionStore, StoreError, StoredInspection};
use crate::workflows::inspection::{InspectionRecord, SubmissionOrchestrator, Variant};

pub(super) const REPORT_TEXT: &str = "REPORT TEXT";

/// Record with every declared attribute of `variant` filled in.
pub(super) fn filled_record(variant: Variant) -> InspectionRecord {
    let mut record = InspectionRecord::new(variant);
    for descriptor in schema::declared_fields(variant) {
        let value = match descriptor.input {
            InputKind::Date => "2024-03-05".to_string(),
            InputKind::Select { options } => options[0].value.to_string(),
            InputKind::Text | InputKind::TextArea => format!("{} checked", descriptor.label),
        };
        record
            .set_field(descriptor.key, &value)
            .expect("declared field accepts value");
    }
    record
}

pub(super) fn token(raw: &str) -> BearerToken {
    BearerToken::new(raw).expect("non-empty token")
}

#[derive(Default)]
pub(super) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<GeneratorReply, GatewayError>>>,
    calls: AtomicUsize,
    credentials: Mutex<Vec<Option<String>>>,
}

impl ScriptedGenerator {
    pub(super) fn replying(reply: GeneratorReply) -> Self {
        let generator = Self::default();
        generator.push(Ok(reply));
        generator
    }

    pub(super) fn push(&self, reply: Result<GeneratorReply, GatewayError>) {
        self.replies
            .lock()
            .expect("generator mutex poisoned")
            .push_back(reply);
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn credentials(&self) -> Vec<Option<String>> {
        self.credentials
            .lock()
            .expect("generator mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl ReportGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _record: &InspectionRecord,
        credential: Option<&BearerToken>,
    ) -> Result<GeneratorReply, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials
            .lock()
            .expect("generator mutex poisoned")
            .push(credential.map(|token| token.expose().to_string()));
        self.replies
            .lock()
            .expect("generator mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(GeneratorReply::report(REPORT_TEXT)))
    }
}

/// Generator that never answers; used to hold a submission in flight.
#[derive(Default)]
pub(super) struct StalledGenerator {
    calls: AtomicUsize,
}

impl StalledGenerator {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportGenerator for StalledGenerator {
    async fn generate(
        &self,
        _record: &InspectionRecord,
        _credential: Option<&BearerToken>,
    ) -> Result<GeneratorReply, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    rows: Mutex<Vec<Value>>,
    calls: AtomicUsize,
    credentials: Mutex<Vec<Option<String>>>,
}

impl MemoryStore {
    pub(super) fn rows(&self) -> Vec<Value> {
        self.rows.lock().expect("store mutex poisoned").clone()
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn credentials(&self) -> Vec<Option<String>> {
        self.credentials
            .lock()
            .expect("store mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl InspectionStore for MemoryStore {
    async fn insert(
        &self,
        payload: &PersistencePayload,
        credential: Option<&BearerToken>,
    ) -> Result<StoredInspection, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials
            .lock()
            .expect("store mutex poisoned")
            .push(credential.map(|token| token.expose().to_string()));
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        let mut row = payload.to_json();
        if let Value::Object(map) = &mut row {
            map.insert("id".to_string(), json!(rows.len() + 1));
        }
        rows.push(row.clone());
        Ok(StoredInspection { row })
    }
}

pub(super) struct FailingStore {
    error: StoreError,
    calls: AtomicUsize,
}

impl FailingStore {
    pub(super) fn new(error: StoreError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InspectionStore for FailingStore {
    async fn insert(
        &self,
        _payload: &PersistencePayload,
        _credential: Option<&BearerToken>,
    ) -> Result<StoredInspection, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Store that never answers; used to observe the persisting stage.
#[derive(Default)]
pub(super) struct StalledStore;

#[async_trait]
impl InspectionStore for StalledStore {
    async fn insert(
        &self,
        _payload: &PersistencePayload,
        _credential: Option<&BearerToken>,
    ) -> Result<StoredInspection, StoreError> {
        std::future::pending().await
    }
}

pub(super) fn orchestrator<G, S>(generator: Arc<G>, store: Arc<S>) -> SubmissionOrchestrator<G, S>
where
    G: ReportGenerator + 'static,
    S: InspectionStore + 'static,
{
    SubmissionOrchestrator::new(
        generator,
        store,
        Arc::new(StaticCredential::new(Some(token("session-token")))),
    )
}

/// Yields to the runtime until `ready` holds, bounded so a broken test fails instead of hanging.
pub(super) async fn yield_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
