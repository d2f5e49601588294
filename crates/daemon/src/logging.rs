//! Tracing subscriber setup

use crate::settings::{DaemonSettings, LogFormat};
use crate::telemetry;
use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "queueease=info";
const LOG_FILE_PREFIX: &str = "queueease.log";

/// Install the global subscriber
///
/// The returned guard flushes the file writer; keep it alive until exit.
pub fn init(settings: &DaemonSettings) -> Result<Option<WorkerGuard>> {
    let (subscriber, guard) = build(settings)?;
    subscriber
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(guard)
}

fn build(
    settings: &DaemonSettings,
) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>)> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let json = (settings.log_format == LogFormat::Json).then(|| fmt::layer().json());
    let pretty = (settings.log_format == LogFormat::Pretty).then(|| fmt::layer().pretty());

    let (file, guard) = match settings.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(telemetry::layer()?)
        .with(env_filter)
        .with(json)
        .with(pretty)
        .with(file);

    Ok((subscriber, guard))
}
