//! Host abstraction.
//!
//! The host owns the visual panels and the sandboxed webviews inside them.
//! Trellis never talks to a concrete UI toolkit; embedders implement [`Host`]
//! and [`Panel`] for their runtime.
//!
//! # Architecture
//!
//! ```text
//! WebviewConnector ──create_panel──▶ Host
//!        │                             │
//!        │◀── messages() / disposed() ─ Panel ◀──▶ embedded content
//!        └── set_html / post_message ─▶
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::HostResult;
use crate::options::ViewColumn;

// =============================================================================
// Panel
// =============================================================================

/// Everything the host needs to create a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSpec {
    /// Panel type identifier (the profile name).
    pub view_type: String,
    /// Tab title.
    pub title: String,
    /// Resolved placement.
    pub column: ViewColumn,
    /// Whether scripts may run inside the webview.
    pub enable_scripts: bool,
    /// Directories the webview may load local resources from.
    pub local_resource_roots: Vec<PathBuf>,
}

/// A host-managed visual container hosting embedded content.
pub trait Panel: Send + Sync {
    /// Replaces the rendered document.
    fn set_html(&self, html: String);

    /// Posts a message into the webview's messaging channel.
    fn post_message(&self, message: Value) -> HostResult<()>;

    /// Sets the tab icon.
    fn set_icon(&self, icon: &Url);

    /// Takes the inbound message stream. Returns `None` once taken.
    fn messages(&self) -> Option<mpsc::UnboundedReceiver<Value>>;

    /// Token cancelled when the panel is disposed, by the host or by [`dispose`](Panel::dispose).
    fn disposed(&self) -> CancellationToken;

    /// Closes the panel. Disposing twice is a no-op.
    fn dispose(&self);

    /// Returns true once the panel has been disposed.
    fn is_disposed(&self) -> bool {
        self.disposed().is_cancelled()
    }
}

/// Shared panel handle.
pub type BoxedPanel = Arc<dyn Panel>;

// =============================================================================
// Notices
// =============================================================================

/// Non-fatal conditions reported to the user through the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The profile's icon could not be parsed; the panel has no icon.
    IconError {
        /// Plugin name.
        plugin: String,
        /// The offending icon string.
        icon: String,
        /// Parse failure.
        reason: String,
    },
    /// The profile's location is unknown; default placement is used.
    LocationWarning {
        /// Plugin name.
        plugin: String,
        /// The unrecognized location.
        location: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IconError {
                plugin,
                icon,
                reason,
            } => write!(f, "Cannot set icon '{icon}' for plugin '{plugin}': {reason}"),
            Self::LocationWarning { plugin, location } => write!(
                f,
                "Plugin '{plugin}' requested unknown location '{location}', using default placement"
            ),
        }
    }
}

// =============================================================================
// Host
// =============================================================================

/// The process that owns panels.
pub trait Host: Send + Sync {
    /// Creates a panel. Must not leave anything behind on failure.
    fn create_panel(&self, spec: PanelSpec) -> HostResult<BoxedPanel>;

    /// Open workspace roots, first one is the primary.
    fn workspace_roots(&self) -> Vec<PathBuf>;

    /// Returns true when some view currently has focus.
    fn has_active_view(&self) -> bool;

    /// Maps a local file to a URI the webview may load.
    ///
    /// Returns `None` when the path cannot be represented (e.g. it is relative).
    fn sandbox_uri(&self, path: &Path) -> Option<String> {
        SandboxScheme::default().encode(path)
    }

    /// Side-channel for non-fatal conditions.
    fn notify(&self, notice: Notice) {
        let _ = notice;
    }
}

/// Shared host handle.
pub type BoxedHost = Arc<dyn Host>;

// =============================================================================
// Sandbox URIs
// =============================================================================

/// Default scheme for local resources.
pub const DEFAULT_SANDBOX_SCHEME: &str = "trellis-resource";

/// Default authority for local resources.
pub const DEFAULT_SANDBOX_AUTHORITY: &str = "localhost";

/// Maps filesystem paths to `scheme://authority/<percent-encoded path>` and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxScheme {
    scheme: String,
    authority: String,
}

impl Default for SandboxScheme {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SANDBOX_SCHEME.to_string(),
            authority: DEFAULT_SANDBOX_AUTHORITY.to_string(),
        }
    }
}

impl SandboxScheme {
    /// Creates a scheme; `None` if `scheme` is not a valid URI scheme.
    pub fn new(scheme: impl Into<String>, authority: impl Into<String>) -> Option<Self> {
        let scheme = scheme.into();
        Self::is_valid_scheme(&scheme).then(|| Self {
            scheme,
            authority: authority.into(),
        })
    }

    /// RFC 3986: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
    pub fn is_valid_scheme(scheme: &str) -> bool {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Encodes an absolute path.
    pub fn encode(&self, path: &Path) -> Option<String> {
        let file = Url::from_file_path(path).ok()?;
        let rest = file.as_str().strip_prefix("file://")?;
        Some(format!("{}://{}{}", self.scheme, self.authority, rest))
    }

    /// Decodes a URI produced by [`encode`](Self::encode).
    pub fn decode(&self, uri: &str) -> Option<PathBuf> {
        let rest = uri
            .strip_prefix(self.scheme.as_str())?
            .strip_prefix("://")?
            .strip_prefix(self.authority.as_str())?;
        Url::parse(&format!("file://{rest}")).ok()?.to_file_path().ok()
    }
}
