use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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

/// Retirement horizon used when no override is configured.
pub const DEFAULT_RETIREMENT_SERVICE_YEARS: u32 = 35;

const DEVELOPMENT_SEAL_SECRET: &str = "development-only-nomination-seal";

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub seal: SealConfig,
    pub roster: RosterConfig,
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

        let seal = match env::var("NOMINATION_SEAL_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => SealConfig {
                secret: SealSecret(secret),
                ephemeral: false,
            },
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingSealSecret)
            }
            _ => SealConfig {
                secret: SealSecret(DEVELOPMENT_SEAL_SECRET.to_string()),
                ephemeral: true,
            },
        };

        let retirement_service_years = match env::var("RETIREMENT_SERVICE_YEARS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|years| *years > 0)
                .ok_or(ConfigError::InvalidRetirementYears(raw))?,
            Err(_) => DEFAULT_RETIREMENT_SERVICE_YEARS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            seal,
            roster: RosterConfig {
                retirement_service_years,
            },
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

/// Server-side salt mixed into every nomination seal.
#[derive(Clone)]
pub struct SealSecret(String);

impl SealSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SealSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealSecret(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct SealConfig {
    pub secret: SealSecret,
    /// True when the built-in development salt is in use.
    pub ephemeral: bool,
}

/// Policy knobs for roster import and criteria conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterConfig {
    pub retirement_service_years: u32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            retirement_service_years: DEFAULT_RETIREMENT_SERVICE_YEARS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingSealSecret,
    InvalidRetirementYears(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { source } => {
                write!(f, "APP_HOST must be an IP address or localhost: {source}")
            }
            ConfigError::MissingSealSecret => {
                write!(f, "NOMINATION_SEAL_SECRET must be set in production")
            }
            ConfigError::InvalidRetirementYears(raw) => write!(
                f,
                "RETIREMENT_SERVICE_YEARS must be a positive integer (found '{raw}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::MissingSealSecret
            | ConfigError::InvalidRetirementYears(_) => None,
        }
    }
}
