//! Subscriber construction and global installation

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{LogError, LogResult};
use chrono::NaiveDate;
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Guard that keeps the logger alive
///
/// Dropping it flushes and stops the background file writer.
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggerGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Name of the log file for `date`: `cellar-YYYY-MM-DD.log`
pub fn log_file_name(date: NaiveDate) -> String {
    format!("cellar-{}.log", date.format("%Y-%m-%d"))
}

fn parse_filter(directive: &str) -> LogResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| LogError::Filter {
        filter: directive.to_string(),
        reason: e.to_string(),
    })
}

fn make_filter(settings: &LoggingSettings) -> LogResult<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.trim().is_empty() => parse_filter(&directive),
        _ => parse_filter(&settings.level),
    }
}

fn open_log_file(dir: &Path) -> LogResult<(NonBlocking, WorkerGuard)> {
    let io_error = |source| LogError::Io {
        path: dir.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io_error)?;

    // Dated once at startup, like the file name; no rotation while running.
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(log_file_name(chrono::Local::now().date_naive()))
        .build(dir)
        .map_err(|e| io_error(std::io::Error::other(e.to_string())))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Writer for the configured locations, with whether ANSI colors are safe
fn make_writer(
    settings: &LoggingSettings,
) -> LogResult<(BoxMakeWriter, Option<WorkerGuard>, bool)> {
    let file = settings.log_directory().map(open_log_file).transpose()?;

    Ok(match (settings.enable_stdout, file) {
        (true, Some((file, guard))) => (
            BoxMakeWriter::new(std::io::stdout.and(file)),
            Some(guard),
            false,
        ),
        (false, Some((file, guard))) => (BoxMakeWriter::new(file), Some(guard), false),
        (true, None) => (BoxMakeWriter::new(std::io::stdout), None, true),
        (false, None) => (BoxMakeWriter::new(std::io::sink), None, false),
    })
}

/// Build a subscriber from settings without installing it
///
/// # Errors
///
/// Returns error if:
/// - The format is unknown
/// - The filter directive cannot be parsed
/// - The log directory or file cannot be created
pub fn build(
    settings: &LoggingSettings,
) -> LogResult<(Box<dyn Subscriber + Send + Sync>, LoggerGuard)> {
    let format = settings.log_format()?;
    let filter = make_filter(settings)?;
    let (writer, file_guard, ansi) = make_writer(settings)?;

    let registry = Registry::default().with(filter);
    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Text => Box::new(
            registry.with(
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_ansi(ansi),
            ),
        ),
        LogFormat::Json => Box::new(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(writer)
                    .with_ansi(false),
            ),
        ),
    };

    Ok((
        subscriber,
        LoggerGuard {
            _file_guard: file_guard,
        },
    ))
}

/// Build and install the global subscriber
///
/// Keep the returned guard alive for the lifetime of the process.
pub fn init(settings: &LoggingSettings) -> LogResult<LoggerGuard> {
    let (subscriber, guard) = build(settings)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

    if !settings.directory.as_os_str().is_empty() && settings.log_directory().is_none() {
        tracing::warn!(
            directory = %settings.directory.display(),
            "log directory is not absolute, file logging disabled"
        );
    }
    Ok(guard)
}
