//! # Trellis
//!
//! Host sandboxed webview panels as plugins of a message-passing engine.
//!
//! ## Overview
//!
//! A plugin's user interface is an `index.html` on disk or on a remote
//! server. Trellis resolves it, rewrites its links so the sandbox can load
//! them, injects a small bridge script and shows it in a host panel. Messages
//! then flow both ways between the panel's content and the engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  call / emit   ┌────────────────────┐  set_html / post  ┌─────────┐
//! │ LocalEngine │◀──────────────▶│   WebviewPlugin    │◀─────────────────▶│  Panel  │
//! │  (manager)  │  request/resp  │ (WebviewConnector) │    messages()     │ (Host)  │
//! └─────────────┘                └────────────────────┘                   └─────────┘
//! ```
//!
//! - **Core** ([`core`]): shared types and the `Host`, `Panel`, `Connector` and `Engine` traits
//! - **Webview** ([`webview`]): resolution, loading, rewriting, bridge injection and relay
//! - **Runtime** ([`runtime`]): configuration, logging and the reference engine
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let engine = Arc::new(LocalEngine::from_config(&config.engine));
//!     let profile = Profile::new("notes").with_url("notes/index.html");
//!     let builder = config
//!         .webview
//!         .connector_builder(profile, host, Some(HostContext::new("/path/to/ext")));
//!     engine.register(WebviewPlugin::from_builder(&engine, builder))?;
//!     engine.call(MANAGER, "activatePlugin", vec!["notes".into()]).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use trellis_core as core;
pub use trellis_runtime as runtime;
pub use trellis_webview as webview;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    // Shared vocabulary
    pub use trellis_core::{
        Connector, ConnectorOptions, Engine, Host, HostContext, MANAGER, Message, Notice, Panel,
        PanelSpec, Plugin, Profile, RelativeTo, ViewColumn,
    };

    // Webview connector
    pub use trellis_webview::{RemotePolicy, WebviewConnector};

    // Runtime
    pub use trellis_runtime::config::{TrellisConfig, load_config};
    pub use trellis_runtime::logging;
    pub use trellis_runtime::{LocalEngine, WebviewPlugin};
}
