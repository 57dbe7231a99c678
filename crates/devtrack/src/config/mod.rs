use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::import::ImportOptions;

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
    pub portfolio: PortfolioConfig,
    pub import: ImportConfig,
    pub audit: AuditConfig,
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

        let seed_path = env::var("PORTFOLIO_SEED")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let price_warning_ratio = env::var("IMPORT_PRICE_WARNING_RATIO")
            .ok()
            .map(|value| value.trim().parse::<f64>())
            .transpose()
            .map_err(|_| ConfigError::InvalidPriceWarningRatio)?
            .unwrap_or(ImportOptions::default().price_warning_ratio);
        if !(price_warning_ratio.is_finite() && price_warning_ratio > 0.0) {
            return Err(ConfigError::InvalidPriceWarningRatio);
        }

        let page_size = env::var("AUDIT_PAGE_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|size| (1..=crate::audit::MAX_PAGE_SIZE).contains(size))
            .ok_or(ConfigError::InvalidAuditPageSize)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            portfolio: PortfolioConfig { seed_path },
            import: ImportConfig {
                price_warning_ratio,
            },
            audit: AuditConfig { page_size },
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

/// Where the base portfolio comes from. `None` means the built-in demo data.
#[derive(Debug, Clone, Default)]
pub struct PortfolioConfig {
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub price_warning_ratio: f64,
}

impl ImportConfig {
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            price_warning_ratio: self.price_warning_ratio,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub page_size: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPriceWarningRatio,
    InvalidAuditPageSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPriceWarningRatio => {
                write!(f, "IMPORT_PRICE_WARNING_RATIO must be a number greater than 0")
            }
            ConfigError::InvalidAuditPageSize => {
                write!(f, "AUDIT_PAGE_SIZE must be between 1 and 500")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPriceWarningRatio
            | ConfigError::InvalidAuditPageSize => None,
        }
    }
}
