//! Logging initialization

use anyhow::{Context, Result};
use capq_core::config::LoggingConfig;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Initialize logging from CLI arguments, falling back to the config file's
/// `[logging]` section where no flag was given.
///
/// The returned guard flushes the log file on drop and must outlive `main`'s work.
pub fn init(args: &Args, file_config: Option<&LoggingConfig>) -> Result<Option<WorkerGuard>> {
    let level = if args.quiet {
        Level::ERROR
    } else {
        match args.verbose {
            0 => file_config
                .and_then(|c| c.level.parse().ok())
                .unwrap_or(Level::INFO),
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = match (args.log_format, file_config) {
        (LogFormat::Text, Some(c)) if c.json_format => LogFormat::Json,
        (format, _) => format,
    };

    let log_file = args
        .log_file
        .clone()
        .or_else(|| file_config.and_then(|c| c.file.clone()));

    let (file_writer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::File::create(Path::new(&path))
                .with_context(|| format!("Failed to create log file: {path}"))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    // Stdout carries command output; logs go to stderr
    match format {
        LogFormat::Text => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(args.verbose >= 2)
                    .with_thread_names(args.verbose >= 2)
                    .with_file(args.verbose >= 3)
                    .with_line_number(args.verbose >= 3),
            );

            if let Some(writer) = file_writer {
                subscriber
                    .with(fmt::layer().with_ansi(false).with_writer(writer))
                    .init();
            } else {
                subscriber.init();
            }
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr));

            if let Some(writer) = file_writer {
                subscriber
                    .with(fmt::layer().json().with_writer(writer))
                    .init();
            } else {
                subscriber.init();
            }
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr));

            if let Some(writer) = file_writer {
                subscriber
                    .with(fmt::layer().compact().with_ansi(false).with_writer(writer))
                    .init();
            } else {
                subscriber.init();
            }
        }
    }

    Ok(guard)
}
