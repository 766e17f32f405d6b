//! Logging initialization for the CLI
//!
//! Supports configuration-based logging with file rotation, JSON formatting
//! and `RUST_LOG` overrides. Console output goes to stderr so command
//! results on stdout stay machine readable.

use std::fs;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const WORKSPACE_TARGETS: [&str; 4] = ["cobalt_cli", "cobalt_engine", "cobalt_query", "cobalt_transport"];

/// Keeps the file writer flushing until the program exits.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging from `config`.
///
/// Returns a guard that must be kept alive for the program duration.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let subscriber = tracing_subscriber::registry().with(build_env_filter(config));

    let file_guard = if config.json {
        let console_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr);
        if config.file_enabled {
            let (file_writer, guard) = create_file_appender(config)?;
            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(file_writer);
            subscriber.with(console_layer).with(file_layer).init();
            Some(guard)
        } else {
            subscriber.with(console_layer).init();
            None
        }
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr);
        if config.file_enabled {
            let (file_writer, guard) = create_file_appender(config)?;
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_writer);
            subscriber.with(console_layer).with(file_layer).init();
            Some(guard)
        } else {
            subscriber.with(console_layer).init();
            None
        }
    };

    tracing::debug!(
        level = %config.level,
        json = config.json,
        file = config.file_enabled,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)))
}

/// Filter directives used when `RUST_LOG` is unset.
fn default_directives(level: &str) -> String {
    let mut directives: Vec<String> = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push("reqwest=warn".to_string());
    directives.push("hyper=warn".to_string());
    directives.join(",")
}

fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "minutely" => Rotation::MINUTELY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn create_file_appender(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let rotation = rotation(&config.file_rotation);
    let prefix = if rotation == Rotation::NEVER {
        format!("{}.log", config.file_prefix)
    } else {
        config.file_prefix.clone()
    };
    let appender = RollingFileAppender::new(rotation, &config.file_directory, prefix);

    Ok(tracing_appender::non_blocking(appender))
}
