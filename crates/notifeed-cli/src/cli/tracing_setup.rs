use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// When set, debug-level logs are also appended to this file
pub const LOG_FILE_ENV: &str = "NOTIFEED_LOG_FILE";

/// Install the global subscriber: stderr filtered by `RUST_LOG` (default
/// `info`), plus an optional plain-text file layer.
pub fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    match std::env::var(LOG_FILE_ENV).ok().filter(|path| !path.is_empty()) {
        Some(log_path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file: {}", log_path))?;

            let file_layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(LevelFilter::DEBUG);

            registry
                .with(file_layer)
                .try_init()
                .context("Failed to install tracing subscriber")?;
            tracing::debug!(path = %log_path, "file logging enabled");
        }
        None => registry
            .try_init()
            .context("Failed to install tracing subscriber")?,
    }
    Ok(())
}
