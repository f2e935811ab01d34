use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::assessment::{
    AssessmentCatalog, AssessmentTypeId, CatalogError, GuidancePolicy,
};

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
    pub assessment: AssessmentConfig,
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

        let default_type = AssessmentTypeId::new(
            env::var("ASSESSMENT_DEFAULT_TYPE").unwrap_or_else(|_| "comprehensive".to_string()),
        );
        let catalog_path = optional_path("ASSESSMENT_CATALOG_PATH");
        let store_dir = optional_path("ASSESSMENT_STORE_DIR");
        let defaults = GuidancePolicy::default();
        let guidance = GuidancePolicy {
            min_dont_know: parse_number(
                "ASSESSMENT_GUIDANCE_MIN_DONT_KNOW",
                defaults.min_dont_know,
            )?,
            min_percent: parse_number("ASSESSMENT_GUIDANCE_MIN_PERCENT", defaults.min_percent)?,
        };
        if guidance.min_percent > 100 {
            return Err(ConfigError::InvalidNumber {
                variable: "ASSESSMENT_GUIDANCE_MIN_PERCENT",
                value: guidance.min_percent.to_string(),
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessment: AssessmentConfig {
                default_type,
                catalog_path,
                store_dir,
                guidance,
            },
        })
    }
}

fn optional_path(variable: &str) -> Option<PathBuf> {
    env::var(variable)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn parse_number<T: std::str::FromStr>(
    variable: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable, value }),
        _ => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Catalog source, persistence location and guidance thresholds.
#[derive(Debug, Clone)]
pub struct AssessmentConfig {
    pub default_type: AssessmentTypeId,
    /// JSON catalog document; the built-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Directory for per-session response files; in-memory when unset.
    pub store_dir: Option<PathBuf>,
    pub guidance: GuidancePolicy,
}

impl AssessmentConfig {
    pub fn load_catalog(&self) -> Result<AssessmentCatalog, CatalogError> {
        let catalog = match &self.catalog_path {
            Some(path) => AssessmentCatalog::from_path(path)?,
            None => AssessmentCatalog::standard(),
        };
        catalog.with_default_type(self.default_type.clone())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{} must be a non-negative number, got '{}'", variable, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
