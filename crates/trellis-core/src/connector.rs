//! Connector capability trait.
//!
//! A connector owns one bidirectional message channel to one embedded content
//! surface. Variants differ in where content comes from; callers only see
//! `connect`, `send`, `receive` and `disconnect`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ConnectorResult;
use crate::message::Message;
use crate::profile::Profile;

/// Engine-side handler for inbound messages.
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// Invoked with the plugin name when the host closes the panel.
pub type DeactivateFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Connection lifecycle.
///
/// ```text
/// Disconnected ──connect()──▶ Connecting ──ok──▶ Connected
///      ▲                           │                 │
///      └───────────err─────────────┘                 │
///      └──────────disconnect() / panel disposed──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// The capability interface every connector variant implements.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The profile this connector was built from.
    fn profile(&self) -> &Profile;

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Establishes the channel. Reconnecting tears the previous one down first.
    async fn connect(&self, url: &str) -> ConnectorResult<()>;

    /// Delivers a message to the content. A no-op when disconnected.
    fn send(&self, message: Message);

    /// Entry point for raw inbound messages; hands them to the engine handler.
    fn receive(&self, raw: Value);

    /// Releases every listener and the panel. Idempotent.
    fn disconnect(&self);

    /// Plugin name, shorthand for `profile().name`.
    fn name(&self) -> &str {
        &self.profile().name
    }
}

/// Shared connector handle.
pub type BoxedConnector = Arc<dyn Connector>;
