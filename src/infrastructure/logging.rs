//! Logging system configuration and initialization.
//!
//! Console output by default, optional non-blocking file output, optional
//! JSON formatting. `RUST_LOG` overrides the configured level and module
//! filters entirely.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

pub use crate::infrastructure::config::LoggingConfig;

lazy_static! {
    // File writer guards must outlive the subscriber or buffered lines are
    // dropped at shutdown.
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Initialize the logging system with default configuration.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize tracing from `LoggingConfig`.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config)?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![filter.boxed()];

    if config.console_output {
        if config.json_format {
            layers.push(fmt::layer().json().boxed());
        } else {
            layers.push(fmt::layer().boxed());
        }
    }

    if config.file_output {
        let log_dir = config
            .file_dir
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("logs"));
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {log_dir:?}"))?;

        let appender = tracing_appender::rolling::daily(&log_dir, "catalog-sync.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        LOG_GUARDS
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(guard);

        if config.json_format {
            layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
        } else {
            layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// `RUST_LOG` wins; otherwise compose the configured level with per-module
/// directives so noisy dependencies stay quiet at info level.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![config.level.clone()];
    for (module, level) in &config.module_filters {
        directives.push(format!("{module}={level}"));
    }

    EnvFilter::try_new(directives.join(","))
        .with_context(|| format!("Invalid log filter built from level '{}'", config.level))
}
