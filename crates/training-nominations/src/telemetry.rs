use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    Filter { directive: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directive, .. } => {
                write!(f, "APP_LOG_LEVEL '{directive}' is not a valid tracing filter")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "a global tracing subscriber is already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

fn filter_for(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::Filter {
        directive: config.log_level.clone(),
        source,
    })
}

/// Install the global subscriber. `RUST_LOG` wins over `APP_LOG_LEVEL` when present.
/// Development output is colored; other environments log plain lines with targets.
pub fn init(config: &TelemetryConfig, environment: AppEnvironment) -> Result<(), TelemetryError> {
    let interactive = environment == AppEnvironment::Development;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(interactive)
        .with_target(!interactive);

    tracing_subscriber::registry()
        .with(filter_for(config)?)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(Box::new(err)))
}
