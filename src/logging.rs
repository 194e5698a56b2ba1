use anyhow::{Context, Result};
use std::fs;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

const FILE_DIRECTIVE: &str = "bloodkit_scraper=debug";
const SECTION_WIDTH: usize = 60;

/// Install the console layer (filtered by `RUST_LOG`, falling back to the
/// configured directive) and, when a log file is configured, a non-blocking
/// file layer at debug level.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole run.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.console_directive))
        .context("invalid console log directive")?;
    let console_layer = fmt::layer().with_target(false).with_filter(console_filter);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            if let Some(dir) = dir {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let file_name = path
                .file_name()
                .with_context(|| format!("log path {} has no file name", path.display()))?;

            let appender = tracing_appender::rolling::never(dir.unwrap_or_else(|| ".".as_ref()), file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(FILE_DIRECTIVE));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("logging already initialized")?;

    if let Some(path) = &config.file {
        info!("Logging to {}", path.display());
    }
    Ok(guard)
}

/// Banner separating listings and products in the log.
pub fn log_section(title: &str) {
    let rule = "=".repeat(SECTION_WIDTH);
    info!("{}", rule);
    info!("{}", title);
    info!("{}", rule);
}
