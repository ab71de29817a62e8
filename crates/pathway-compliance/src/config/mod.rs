use crate::pathways::classifier::{ComplianceClassifier, DerivationPolicy};
use crate::pathways::dashboard::DashboardSource;
use crate::pathways::service::EngineSettings;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_COMPLIANCE_THRESHOLD: f64 = 80.0;

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
    pub compliance: ComplianceConfig,
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
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(value) if value.trim().eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            compliance: ComplianceConfig::from_env()?,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Engine policy dials: dashboard data precedence, compliance derivation, notification text.
#[derive(Debug, Clone, Default)]
pub struct ComplianceConfig {
    pub dashboard_source: DashboardSource,
    pub derivation: DerivationPolicy,
    pub notification_template: Option<String>,
}

impl ComplianceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let dashboard_source = match env::var("PATHWAY_DASHBOARD_SOURCE") {
            Ok(value) => value
                .parse::<DashboardSource>()
                .map_err(|_| ConfigError::InvalidDashboardSource(value))?,
            Err(_) => DashboardSource::default(),
        };

        let derivation = match env::var("PATHWAY_COMPLIANCE_DERIVATION") {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "placeholder" => DerivationPolicy::Placeholder,
                "checklist_threshold" | "checklist-threshold" => {
                    DerivationPolicy::ChecklistThreshold {
                        threshold_pct: threshold_from_env()?,
                    }
                }
                _ => return Err(ConfigError::InvalidDerivation(value)),
            },
            Err(_) => DerivationPolicy::Placeholder,
        };

        let notification_template = env::var("PATHWAY_NOTIFICATION_TEMPLATE")
            .ok()
            .filter(|template| !template.trim().is_empty());

        Ok(Self {
            dashboard_source,
            derivation,
            notification_template,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            classifier: ComplianceClassifier::new(self.derivation),
            dashboard_source: self.dashboard_source,
            notification_template: self.notification_template.clone(),
        }
    }
}

fn threshold_from_env() -> Result<f64, ConfigError> {
    match env::var("PATHWAY_COMPLIANCE_THRESHOLD") {
        Ok(value) => {
            let parsed = value
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidThreshold(value.clone()))?;
            if parsed.is_finite() {
                Ok(parsed.clamp(0.0, 100.0))
            } else {
                Err(ConfigError::InvalidThreshold(value))
            }
        }
        Err(_) => Ok(DEFAULT_COMPLIANCE_THRESHOLD),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDashboardSource(String),
    InvalidDerivation(String),
    InvalidThreshold(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDashboardSource(value) => write!(
                f,
                "PATHWAY_DASHBOARD_SOURCE must be live_first, live_only or precomputed_only (found '{}')",
                value
            ),
            ConfigError::InvalidDerivation(value) => write!(
                f,
                "PATHWAY_COMPLIANCE_DERIVATION must be placeholder or checklist_threshold (found '{}')",
                value
            ),
            ConfigError::InvalidThreshold(value) => write!(
                f,
                "PATHWAY_COMPLIANCE_THRESHOLD must be a percentage (found '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
