//! Unified error types for the Trellis core.
//!
//! Fatal failures of a connect attempt are split into configuration problems
//! (nothing can succeed until the caller fixes its setup) and connect problems
//! (content or panel unavailable; the caller may simply retry). Non-fatal
//! conditions are not errors at all, see [`Notice`](crate::host::Notice).

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Connector Errors
// =============================================================================

/// Required context is missing at resolve time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Local resolution against the extension directory without a host context.
    #[error("connector '{plugin}' has no host context; cannot resolve local path '{path}'")]
    MissingContext {
        /// Name of the plugin being connected.
        plugin: String,
        /// The path that could not be resolved.
        path: String,
    },

    /// Local resolution against the workspace while no workspace is open.
    #[error("no open workspace; cannot resolve relative path '{path}'")]
    NoWorkspace {
        /// The path that could not be resolved.
        path: String,
    },
}

/// Content could not be loaded or the panel could not be created.
#[derive(Debug, Clone, Error)]
pub enum ConnectError {
    /// Local `index.html` could not be read.
    #[error("failed to read {}: {reason}", path.display())]
    ReadFailed {
        /// The file that failed to load.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Remote `index.html` could not be fetched.
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed {
        /// The URL that failed.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Remote fetch exceeded the configured timeout.
    #[error("fetching {url} timed out after {timeout_ms} ms")]
    FetchTimeout {
        /// The URL that timed out.
        url: String,
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// Remote server answered with a non-success status.
    #[error("fetching {url} returned HTTP {status}")]
    FetchStatus {
        /// The URL that was fetched.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The host refused to create the panel.
    #[error("panel creation failed: {0}")]
    PanelCreation(#[from] HostError),
}

/// Errors returned by [`Connector::connect`](crate::connector::Connector::connect).
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// Setup problem, surfaced before any I/O.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Content or panel unavailable for this attempt.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A second `connect` arrived while the first was still in flight.
    #[error("connector '{plugin}' is already connecting")]
    AlreadyConnecting {
        /// Name of the plugin being connected.
        plugin: String,
    },

    /// `disconnect` ran while the attempt was in flight.
    #[error("connect of '{plugin}' was cancelled by disconnect")]
    Cancelled {
        /// Name of the plugin being connected.
        plugin: String,
    },
}

impl ConnectorError {
    /// Returns true for configuration failures.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

// =============================================================================
// Host Errors
// =============================================================================

/// Errors reported by a [`Host`](crate::host::Host) or [`Panel`](crate::host::Panel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host declined to create a panel.
    #[error("panel rejected: {0}")]
    PanelRejected(String),

    /// The panel was already disposed.
    #[error("panel is disposed")]
    Disposed,

    /// The message could not be delivered into the panel.
    #[error("failed to post message: {0}")]
    PostFailed(String),
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors that can occur when talking to the plugin engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// No plugin with this name is registered.
    #[error("plugin '{0}' is not registered")]
    PluginNotFound(String),

    /// The plugin does not expose this method.
    #[error("plugin '{plugin}' has no method '{method}'")]
    MethodNotFound {
        /// Target plugin.
        plugin: String,
        /// Requested method.
        method: String,
    },

    /// A plugin with the same name is already registered.
    #[error("plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    /// The plugin is registered but not active.
    #[error("plugin '{0}' is not active")]
    NotActive(String),

    /// The call did not receive a response in time.
    #[error("call to {plugin}.{method} timed out")]
    Timeout {
        /// Target plugin.
        plugin: String,
        /// Requested method.
        method: String,
    },

    /// The connector behind the plugin went away before answering.
    #[error("plugin '{0}' is not connected")]
    NotConnected(String),

    /// The remote side answered with an error.
    #[error("{0}")]
    Remote(String),

    /// Invalid arguments for a built-in method.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Activating a connector-backed plugin failed.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
