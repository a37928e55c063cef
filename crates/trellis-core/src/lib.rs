//! # Trellis Core
//!
//! Shared vocabulary for the Trellis webview plugin bridge.
//!
//! Trellis connects a message-passing plugin engine to sandboxed webview
//! panels owned by a host process. This crate holds everything both sides
//! agree on and nothing that does I/O:
//!
//! - **Data model**: [`Profile`], [`ConnectorOptions`], [`Message`], [`ConnectionState`]
//! - **Host surface**: [`Host`], [`Panel`], [`PanelSpec`], [`Notice`], [`SandboxScheme`]
//! - **Engine surface**: [`Engine`], [`Plugin`]
//! - **Connector capability**: [`Connector`], [`MessageHandler`], [`DeactivateFn`]
//! - **Listener ownership**: [`ListenerSet`], [`ListenerHandle`]
//! - **Errors**: [`ConnectorError`], [`ConfigurationError`], [`ConnectError`],
//!   [`HostError`], [`EngineError`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  call/emit   ┌─────────────────┐  set_html/post   ┌───────┐
//! │  Engine  │◀────────────▶│    Connector    │◀────────────────▶│ Panel │
//! └──────────┘  Message     └─────────────────┘  messages()      └───────┘
//!                                   │ create_panel                   ▲
//!                                   ▼                                │
//!                               ┌──────┐─────────────────────────────┘
//!                               │ Host │
//!                               └──────┘
//! ```

pub mod connector;
pub mod engine;
pub mod error;
pub mod host;
pub mod listener;
pub mod message;
pub mod options;
pub mod profile;

pub use connector::{BoxedConnector, ConnectionState, Connector, DeactivateFn, MessageHandler};
pub use engine::{BoxedPlugin, Engine, MANAGER, Plugin, deactivate_via};
pub use error::{
    ConfigurationError, ConnectError, ConnectorError, ConnectorResult, EngineError, EngineResult,
    HostError, HostResult,
};
pub use host::{
    BoxedHost, BoxedPanel, DEFAULT_SANDBOX_AUTHORITY, DEFAULT_SANDBOX_SCHEME, Host, Notice, Panel,
    PanelSpec, SandboxScheme,
};
pub use listener::{ListenerHandle, ListenerSet};
pub use message::Message;
pub use options::{ConnectorOptions, HostContext, OptionsPatch, RelativeTo, ViewColumn};
pub use profile::{Location, Profile, UnknownLocation};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Connector, ConnectorOptions, Engine, Host, Message, Panel, Plugin, Profile, RelativeTo,
        ViewColumn,
    };
}
