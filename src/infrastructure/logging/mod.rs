//! Tracing-based logging setup.
//!
//! Verbosity is environment-driven: the configured level is the default
//! directive, and `RUST_LOG` overrides it per target.

use std::io;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::domain::models::config::LoggingConfig;
use crate::infrastructure::config::ConfigError;

/// Keeps the non-blocking log writer alive; hold it for the process lifetime.
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber from configuration.
///
/// Stdout output honors the configured format; the optional file output is
/// always JSON with daily rotation.
pub fn init(config: &LoggingConfig) -> Result<LogGuard> {
    let default_level = parse_level(&config.level)?;
    parse_format(&config.format)?;

    let make_filter = || {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut guard = None;

    if let Some(ref log_dir) = config.log_dir {
        let appender = rolling::daily(log_dir, "docvault.log");
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);

        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(make_filter())
                .boxed(),
        );
    }

    if config.format == "pretty" {
        layers.push(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stdout)
                .with_target(true)
                .with_filter(make_filter())
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stdout)
                .with_target(true)
                .with_filter(make_filter())
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("failed to set global tracing subscriber")?;

    Ok(LogGuard { _guard: guard })
}

fn parse_level(level: &str) -> Result<Level, ConfigError> {
    match level {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(ConfigError::InvalidLogLevel(other.to_string())),
    }
}

fn parse_format(format: &str) -> Result<(), ConfigError> {
    match format {
        "json" | "pretty" => Ok(()),
        other => Err(ConfigError::InvalidLogFormat(other.to_string())),
    }
}
