//! Logging Infrastructure
//!
//! Structured logging for development (compact text) and production (JSON),
//! with optional daily-rolling file output.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the logger
///
/// `RUST_LOG` wins over `log_level`. The returned guard flushes the file
/// writer and must be held for the process lifetime.
pub fn init_logger_with_file(
    log_level: &str,
    json: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "register_server={log_level},shared={log_level},tower_http=info"
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        std::fs::create_dir_all(log_path)?;
        let file_appender = tracing_appender::rolling::daily(log_path, "register-server");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let builder = builder.with_writer(writer).with_ansi(false);
        if json {
            builder
                .json()
                .try_init()
                .map_err(|e| anyhow::anyhow!("{e}"))?;
        } else {
            builder.try_init().map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        return Ok(Some(guard));
    }

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    } else {
        builder.compact().try_init().map_err(|e| anyhow::anyhow!("{e}"))?;
    }
    Ok(None)
}
