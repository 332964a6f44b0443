use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "logpilot=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

pub fn logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("logpilot")
        .join("logs")
}

/// Log to a daily rolling file. The terminal belongs to the UI while the chat
/// is running, so nothing may be written to stdout/stderr.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_file() -> Result<WorkerGuard> {
    let dir = logs_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&dir, "logpilot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::Layer::new().with_ansi(false).with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber).context("setting global subscriber")?;

    Ok(guard)
}

/// Log to stderr, for the one-shot commands
pub fn init_stderr() -> Result<()> {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::Layer::new().with_writer(io::stderr));
    tracing::subscriber::set_global_default(subscriber).context("setting global subscriber")?;
    Ok(())
}
