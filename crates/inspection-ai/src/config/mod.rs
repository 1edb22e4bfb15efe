use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::inspection::VariantSwitchPolicy;

const DEFAULT_REPORTS_TABLE: &str = "reports";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const GENERATOR_FUNCTION_PATH: &str = "functions/v1/generate-report";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: Option<BackendConfig>,
    pub variant_switch: VariantSwitchPolicy,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let request_timeout = match non_empty_var("APP_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidTimeout)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let variant_switch = match non_empty_var("APP_VARIANT_SWITCH") {
            Some(raw) => VariantSwitchPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidVariantSwitch { value: raw })?,
            None => VariantSwitchPolicy::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend: BackendConfig::from_env(),
            variant_switch,
            request_timeout,
        })
    }

    /// Backend settings, required by anything that talks to the generator or store.
    pub fn backend(&self) -> Result<&BackendConfig, ConfigError> {
        self.backend.as_ref().ok_or(ConfigError::MissingVar {
            name: "SUPABASE_URL / SUPABASE_ANON_KEY",
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Managed backend hosting the report generator function and the reports table.
#[derive(Clone)]
pub struct BackendConfig {
    pub supabase_url: String,
    pub anon_key: String,
    pub generator_url: String,
    pub reports_table: String,
}

impl BackendConfig {
    fn from_env() -> Option<Self> {
        let supabase_url = non_empty_var("SUPABASE_URL")?;
        let anon_key = non_empty_var("SUPABASE_ANON_KEY")?;
        let generator_url = non_empty_var("GENERATOR_URL").unwrap_or_else(|| {
            format!(
                "{}/{}",
                supabase_url.trim_end_matches('/'),
                GENERATOR_FUNCTION_PATH
            )
        });
        let reports_table = non_empty_var("APP_REPORTS_TABLE")
            .unwrap_or_else(|| DEFAULT_REPORTS_TABLE.to_string());

        Some(Self {
            supabase_url,
            anon_key,
            generator_url,
            reports_table,
        })
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("supabase_url", &self.supabase_url)
            .field("anon_key", &"<redacted>")
            .field("generator_url", &self.generator_url)
            .field("reports_table", &self.reports_table)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidVariantSwitch { value: String },
    MissingVar { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "APP_REQUEST_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidVariantSwitch { value } => write!(
                f,
                "APP_VARIANT_SWITCH must be 'preserve-common' or 'reset', got '{}'",
                value
            ),
            ConfigError::MissingVar { name } => {
                write!(f, "{} must be set to reach the inspection backend", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidVariantSwitch { .. }
            | ConfigError::MissingVar { .. } => None,
        }
    }
}
