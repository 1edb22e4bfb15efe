use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::domain::InspectionRecord;
use super::session::BearerToken;

/// Decoded generator response body: `{report}` on success, `{error}` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeneratorBody {
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Transport-level view of one generator exchange. `body` is `None` when the
/// response was not a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorReply {
    pub status: u16,
    pub body: Option<GeneratorBody>,
}

impl GeneratorReply {
    pub fn report(text: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: Some(GeneratorBody {
                report: Some(text.into()),
                error: None,
            }),
        }
    }

    pub fn rejected(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(GeneratorBody {
                report: None,
                error: Some(error.into()),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The generator could not be reached at all.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("report generator unreachable: {0}")]
    Transport(String),
    #[error("report generator did not respond in time")]
    Timeout,
    #[error("invalid report generator client configuration: {0}")]
    Client(String),
}

/// External text-generation service producing report prose from a record.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(
        &self,
        record: &InspectionRecord,
        credential: Option<&BearerToken>,
    ) -> Result<GeneratorReply, GatewayError>;
}

/// Failure to obtain report text, at transport or application level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Non-2xx status, with the embedded `error` field when one was present.
    Status { status: u16, detail: Option<String> },
    /// 2xx status carrying an application-level `error` field.
    Rejected(String),
    /// 2xx status with neither `report` nor `error`.
    EmptyReport,
    /// 2xx status with a body that is not a generator response.
    Malformed,
    Unreachable(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Status {
                status,
                detail: Some(detail),
            } => write!(
                f,
                "report generation failed with status {}: {}",
                status, detail
            ),
            GenerationError::Status { status, detail: None } => {
                write!(f, "report generation failed with status {}", status)
            }
            GenerationError::Rejected(message) => f.write_str(message),
            GenerationError::EmptyReport => {
                f.write_str("generation reported success with no content")
            }
            GenerationError::Malformed => {
                f.write_str("report generator returned an unreadable response")
            }
            GenerationError::Unreachable(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<GatewayError> for GenerationError {
    fn from(value: GatewayError) -> Self {
        GenerationError::Unreachable(value.to_string())
    }
}

/// Turns a generator reply into report text, keeping the three failure
/// outcomes apart.
pub fn interpret_reply(reply: GeneratorReply) -> Result<String, GenerationError> {
    let success = reply.is_success();
    let GeneratorReply { status, body } = reply;

    if !success {
        let detail = body
            .and_then(|body| body.error)
            .filter(|error| !error.trim().is_empty());
        return Err(GenerationError::Status { status, detail });
    }

    let body = body.ok_or(GenerationError::Malformed)?;
    if let Some(error) = body.error.filter(|error| !error.trim().is_empty()) {
        return Err(GenerationError::Rejected(error));
    }

    match body.report {
        Some(report) if !report.is_empty() => Ok(report),
        _ => Err(GenerationError::EmptyReport),
    }
}

/// Calls the hosted `generate-report` function over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReportGenerator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReportGenerator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Client(err.to_string()))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_error(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ReportGenerator for HttpReportGenerator {
    async fn generate(
        &self,
        record: &InspectionRecord,
        credential: Option<&BearerToken>,
    ) -> Result<GeneratorReply, GatewayError> {
        let mut request = self.client.post(&self.endpoint).json(record);
        if let Some(token) = credential {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await.map_err(Self::map_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(Self::map_error)?;
        let body = serde_json::from_slice::<GeneratorBody>(&bytes).ok();

        tracing::debug!(status, response_bytes = bytes.len(), "report generator replied");
        Ok(GeneratorReply { status, body })
    }
}
