use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::inspection::{GatewayError, StoreError, SubmissionError, SubmissionErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Record(serde_json::Error),
    Gateway(GatewayError),
    Store(StoreError),
    Submission(SubmissionError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Record(err) => write!(f, "invalid inspection record: {}", err),
            AppError::Gateway(err) => write!(f, "generator error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Submission(err) => write!(f, "submission error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Record(err) => Some(err),
            AppError::Gateway(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Submission(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Submission(err) => match err.kind() {
                Some(SubmissionErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
                Some(SubmissionErrorKind::Generation | SubmissionErrorKind::Persistence) => {
                    StatusCode::BAD_GATEWAY
                }
                None => StatusCode::CONFLICT,
            },
            AppError::Record(_) => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) | AppError::Store(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Record(value)
    }
}

impl From<GatewayError> for AppError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<SubmissionError> for AppError {
    fn from(value: SubmissionError) -> Self {
        Self::Submission(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::inspection::{ValidationError, Variant};

    #[test]
    fn submission_failures_map_to_distinct_statuses() {
        let validation = AppError::from(SubmissionError::Validation(ValidationError {
            variant: Variant::Piping,
            missing: Vec::new(),
        }));
        let persistence = AppError::from(SubmissionError::Persistence(StoreError::new("offline")));
        let in_flight = AppError::from(SubmissionError::InFlight);

        assert_eq!(
            validation.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(persistence.into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(in_flight.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_backend_is_a_server_error() {
        let err = AppError::from(ConfigError::MissingVar {
            name: "SUPABASE_URL",
        });
        assert!(err.to_string().starts_with("configuration error:"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
