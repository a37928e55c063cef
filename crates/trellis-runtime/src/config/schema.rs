//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use trellis_core::{
    BoxedHost, ConnectorOptions, DEFAULT_SANDBOX_AUTHORITY, DEFAULT_SANDBOX_SCHEME, HostContext,
    Profile, RelativeTo, SandboxScheme,
};
use trellis_webview::{RemotePolicy, WebviewConnector, WebviewConnectorBuilder};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrellisConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults for webview connectors.
    #[serde(default)]
    pub webview: WebviewConfig,

    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// When the log file is rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Rollover schedule for file output. Rolled files get a date suffix.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `trellis_webview = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::default(),
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Webview
// =============================================================================

/// Defaults applied to every webview connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebviewConfig {
    /// Base for relative local sources.
    #[serde(default)]
    pub relative_to: RelativeTo,

    /// Reload local content when `index.html` changes.
    #[serde(default)]
    pub dev_mode: bool,

    /// How remote sources are rendered.
    #[serde(default)]
    pub remote_policy: RemotePolicy,

    /// Remote fetch timeout in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// URI scheme local resources are served under.
    #[serde(default = "default_sandbox_scheme")]
    pub sandbox_scheme: String,
}

impl Default for WebviewConfig {
    fn default() -> Self {
        Self {
            relative_to: RelativeTo::default(),
            dev_mode: false,
            remote_policy: RemotePolicy::default(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            sandbox_scheme: default_sandbox_scheme(),
        }
    }
}

impl WebviewConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// The configured sandbox scheme; `None` if the scheme is invalid.
    pub fn sandbox(&self) -> Option<SandboxScheme> {
        SandboxScheme::new(self.sandbox_scheme.clone(), DEFAULT_SANDBOX_AUTHORITY)
    }

    /// Connector options carrying these defaults.
    pub fn connector_options(&self, context: Option<HostContext>) -> ConnectorOptions {
        let options = ConnectorOptions::default()
            .with_relative_to(self.relative_to)
            .with_dev_mode(self.dev_mode);
        match context {
            Some(context) => options.with_context(context),
            None => options,
        }
    }

    /// A connector builder preconfigured from these defaults.
    pub fn connector_builder(
        &self,
        profile: Profile,
        host: BoxedHost,
        context: Option<HostContext>,
    ) -> WebviewConnectorBuilder {
        WebviewConnector::builder(profile, host)
            .options(self.connector_options(context))
            .remote_policy(self.remote_policy)
            .fetch_timeout(self.fetch_timeout())
    }
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_sandbox_scheme() -> String {
    DEFAULT_SANDBOX_SCHEME.to_string()
}

// =============================================================================
// Engine
// =============================================================================

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a call into a connector-backed plugin waits for its response.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl EngineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn default_call_timeout_ms() -> u64 {
    30_000
}
