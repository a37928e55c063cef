//! Logging setup built on `tracing` and `tracing-subscriber`.
//!
//! Connect attempts, reloads and engine calls all log through `tracing`;
//! this module installs a subscriber for them from [`LoggingConfig`].
//!
//! ```rust,ignore
//! use trellis_runtime::config::load_config;
//! use trellis_runtime::logging;
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```

use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig};

/// File name used when `file_path` names a directory.
pub const DEFAULT_LOG_FILE: &str = "trellis.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = try_init_from_config(config);
}

/// Like [`init_from_config`], but reports an already installed subscriber.
pub fn try_init_from_config(config: &LoggingConfig) -> Result<(), TryInitError> {
    let (writer, fallback) = make_writer(config);
    tracing_subscriber::registry()
        .with(fmt_layer(config, writer))
        .with(env_filter(config))
        .try_init()?;
    if let Some(reason) = fallback {
        warn!(reason = %reason, "File output unavailable, logging to stdout");
    }
    Ok(())
}

/// `RUST_LOG` when set, otherwise the configured level and per-module filters.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level.to_tracing_level()).into())
        .parse_lossy(directives(config).join(","))
}

/// Per-module directives, sorted so the filter does not depend on map order.
fn directives(config: &LoggingConfig) -> Vec<String> {
    let mut directives: Vec<String> = config
        .filters
        .iter()
        .map(|(target, level)| format!("{target}={level}"))
        .collect();
    directives.sort();
    directives
}

fn fmt_layer(config: &LoggingConfig, writer: BoxMakeWriter) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);
    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Returns the writer, and why file output fell back to stdout if it did.
fn make_writer(config: &LoggingConfig) -> (BoxMakeWriter, Option<String>) {
    let stdout = || BoxMakeWriter::new(std::io::stdout);
    match (config.output, &config.file_path) {
        (LogOutput::Stdout, _) => (stdout(), None),
        (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), None),
        (LogOutput::File, None) => (stdout(), Some("no file path configured".into())),
        (LogOutput::File, Some(path)) => {
            let (dir, file) = split_log_path(path);
            let rotation = match config.rotation {
                LogRotation::Never => Rotation::NEVER,
                LogRotation::Hourly => Rotation::HOURLY,
                LogRotation::Daily => Rotation::DAILY,
            };
            match RollingFileAppender::builder()
                .rotation(rotation)
                .filename_prefix(file.to_string_lossy())
                .build(dir)
            {
                Ok(appender) => (BoxMakeWriter::new(appender), None),
                Err(e) => (stdout(), Some(e.to_string())),
            }
        }
    }
}

/// Splits `path` into the directory and file name handed to the appender.
fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    if path.is_dir() {
        return (path.to_path_buf(), PathBuf::from(DEFAULT_LOG_FILE));
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path
        .file_name()
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from);
    (dir, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_directives_sorted() {
        let mut config = LoggingConfig::default();
        config
            .filters
            .insert("trellis_webview".into(), LogLevel::Trace);
        config.filters.insert("hyper".into(), LogLevel::Warn);
        assert_eq!(
            directives(&config),
            vec!["hyper=warn".to_string(), "trellis_webview=trace".to_string()]
        );
    }

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new("logs/panel.log")),
            (PathBuf::from("logs"), PathBuf::from("panel.log"))
        );
        assert_eq!(
            split_log_path(Path::new("panel.log")),
            (PathBuf::from("."), PathBuf::from("panel.log"))
        );

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            split_log_path(dir.path()),
            (dir.path().to_path_buf(), PathBuf::from(DEFAULT_LOG_FILE))
        );
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let config = LoggingConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        assert!(make_writer(&config).1.is_some());

        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            output: LogOutput::File,
            file_path: Some(dir.path().join("trellis.log")),
            rotation: LogRotation::Daily,
            ..Default::default()
        };
        assert!(make_writer(&config).1.is_none());

        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let config = LoggingConfig {
            output: LogOutput::File,
            file_path: Some(blocker.join("trellis.log")),
            ..Default::default()
        };
        assert!(make_writer(&config).1.is_some());
    }
}
