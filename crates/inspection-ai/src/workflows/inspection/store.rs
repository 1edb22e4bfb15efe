use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalizer::PersistencePayload;
use super::session::BearerToken;

/// Structured store failure: a primary message plus optional detail and hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreError {
    pub message: String,
    #[serde(default, alias = "details")]
    pub detail: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            hint: None,
            code: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(detail) = self.detail.as_deref().filter(|d| !d.is_empty()) {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

/// Row echoed back by the store after an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredInspection {
    pub row: Value,
}

impl StoredInspection {
    pub fn id(&self) -> Option<&Value> {
        self.row.get("id")
    }
}

/// Insert-one persistence collaborator. The insert runs as the caller when a
/// credential is given, so row-level policies see the signed-in user.
#[async_trait]
pub trait InspectionStore: Send + Sync {
    async fn insert(
        &self,
        payload: &PersistencePayload,
        credential: Option<&BearerToken>,
    ) -> Result<StoredInspection, StoreError>;
}

/// PostgREST-backed store (the managed database's REST interface).
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    table: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(
        base_url: impl Into<String>,
        table: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::new(format!("invalid store client configuration: {err}")))?;
        Ok(Self::with_client(client, base_url, table, api_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        table: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            table: table.into(),
            api_key: api_key.into(),
        }
    }

    pub fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }

    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| StoreError::new("store API key is not a valid header value"))?;
        headers.insert("apikey", api_key);
        headers.insert("prefer", HeaderValue::from_static("return=representation"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.pgrst.object+json"),
        );
        Ok(headers)
    }
}

#[async_trait]
impl InspectionStore for PostgrestStore {
    async fn insert(
        &self,
        payload: &PersistencePayload,
        credential: Option<&BearerToken>,
    ) -> Result<StoredInspection, StoreError> {
        let bearer = credential.map_or(self.api_key.as_str(), BearerToken::expose);
        let response = self
            .client
            .post(self.table_url())
            .headers(self.headers()?)
            .bearer_auth(bearer)
            .json(&[payload])
            .send()
            .await
            .map_err(|err| StoreError::new(format!("store unreachable: {err}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| StoreError::new(format!("store response unreadable: {err}")))?;

        if !status.is_success() {
            return Err(serde_json::from_slice::<StoreError>(&bytes).unwrap_or_else(|_| {
                StoreError::new(format!("store rejected insert with status {}", status.as_u16()))
            }));
        }

        let row = serde_json::from_slice::<Value>(&bytes)
            .map_err(|err| StoreError::new(format!("store returned invalid JSON: {err}")))?;
        Ok(StoredInspection { row })
    }
}
