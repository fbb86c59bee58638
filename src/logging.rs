use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Overrides `logging.file` when set.
pub const LOG_FILE_ENV: &str = "TETHER_LOG";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.level`. Output goes to stdout unless a log
/// file is configured, in which case it is appended to without ANSI colors.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log filter '{}'", config.level))?;

    let file = std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|path| !path.is_empty())
        .or_else(|| config.file.clone());

    match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file '{path}'"))?;
            let layer = fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_timer(UtcTime::rfc_3339());
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
        None => {
            let layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_timer(UtcTime::rfc_3339());
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
    }
    Ok(())
}
