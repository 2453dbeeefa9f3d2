//! Tracing setup shared by the server and the CLI.
//!
//! Console output is compact and human readable. A second layer writes plain text to a log file
//! and records each request span as it closes, so every summarize or answer request leaves one
//! timing line tagged with its `request_id`. HTTP client and PDF parser chatter is capped at `warn`
//! unless `RUST_LOG` says otherwise.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::ParseError,
    fmt::{self, format::FmtSpan},
    prelude::*,
    util::TryInitError,
};

use crate::config::Config;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_NAME: &str = "docdigest.log";

const DEPENDENCY_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "h2=warn",
    "reqwest=warn",
    "pdf_extract=error",
    "lopdf=error",
];

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured level could not be turned into a filter.
    #[error("Invalid log filter {directives:?}: {source}")]
    Filter {
        /// Directives that failed to parse.
        directives: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },
    /// The log file or its directory could not be opened.
    #[error("Failed to open log destination {path}: {source}")]
    Io {
        /// Path that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A global subscriber was already installed.
    #[error(transparent)]
    Init(#[from] TryInitError),
}

/// Where console output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    /// The server logs to stdout.
    Stdout,
    /// The CLI keeps stdout for summaries and answers.
    Stderr,
}

/// File target for the plain-text log layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Append to one fixed file.
    File(PathBuf),
    /// Daily-rotated `docdigest.log` files inside a directory.
    Directory(PathBuf),
}

impl LogDestination {
    /// Resolve the destination from `log_file`, falling back to `log_dir`.
    pub fn from_config(config: &Config) -> Self {
        match &config.log_file {
            Some(path) => Self::File(PathBuf::from(path)),
            None => Self::Directory(PathBuf::from(&config.log_dir)),
        }
    }
}

/// Filter directives for `level` with dependency crates held at quieter levels.
pub fn filter_directives(level: &str) -> String {
    std::iter::once(level.trim())
        .chain(DEPENDENCY_DIRECTIVES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. `RUST_LOG` overrides `config.log_level` when set.
pub fn init_tracing(config: &Config, console: Console) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;
    let writer = open_writer(&LogDestination::from_config(config))?;

    let console_layer = fmt::layer().with_target(false).compact();
    let console_layer = match console {
        Console::Stdout => console_layer.boxed(),
        Console::Stderr => console_layer.with_writer(std::io::stderr).boxed(),
    };
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn build_filter(config: &Config) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = filter_directives(&config.log_level);
    EnvFilter::try_new(&directives).map_err(|source| LoggingError::Filter { directives, source })
}

fn open_writer(destination: &LogDestination) -> Result<NonBlocking, LoggingError> {
    let (writer, guard) = match destination {
        LogDestination::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing_appender::non_blocking(file)
        }
        LogDestination::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Io {
                path: dir.clone(),
                source,
            })?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_NAME))
        }
    };
    let _ = LOG_GUARD.set(guard);
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_prefers_explicit_file() {
        let config = Config {
            log_file: Some("/var/log/docdigest/server.log".into()),
            ..Config::default()
        };
        assert_eq!(
            LogDestination::from_config(&config),
            LogDestination::File(PathBuf::from("/var/log/docdigest/server.log"))
        );
        assert_eq!(
            LogDestination::from_config(&Config::default()),
            LogDestination::Directory(PathBuf::from("logs"))
        );
    }

    #[test]
    fn directives_quiet_dependencies_below_configured_level() {
        let directives = filter_directives(" debug ");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("reqwest=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn malformed_level_is_reported() {
        let config = Config {
            log_level: "docdigest=loud=very".into(),
            ..Config::default()
        };
        // SAFETY: no other test in this crate reads or writes RUST_LOG.
        unsafe { std::env::remove_var("RUST_LOG") };
        assert!(matches!(
            build_filter(&config),
            Err(LoggingError::Filter { .. })
        ));
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let destination =
            LogDestination::File(PathBuf::from("/nonexistent-docdigest-dir/sub/docdigest.log"));
        let error = open_writer(&destination).unwrap_err();
        assert!(matches!(error, LoggingError::Io { .. }));
    }
}
