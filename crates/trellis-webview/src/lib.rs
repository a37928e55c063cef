//! # Trellis Webview
//!
//! The webview connector: renders a plugin's HTML content inside a host panel
//! and relays messages between that content and the plugin engine.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |---|---|---|
//! | Resolve | [`resolver`] | [`ResolvedSource`]: local base directory or remote base URL |
//! | Rewrite | [`rewriter`] | `href`/`src` values mapped to sandbox URIs or absolute URLs |
//! | Bridge | [`bridge`] | compatibility script injected once per document |
//! | Load | [`loader`] | final document, per [`RemotePolicy`] for remote content |
//! | Open | [`panel`] | panel with placement, icon and resource roots |
//! | Relay | [`relay`] | [`WebviewConnector`], the connection state machine |
//! | Reload | [`watch`] | dev-mode re-render on `index.html` changes |
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use trellis_webview::WebviewConnector;
//! use trellis_core::prelude::*;
//!
//! let connector = WebviewConnector::builder(Profile::new("widget"), host)
//!     .options(ConnectorOptions::default().with_context(HostContext::new("/ext")))
//!     .build();
//! connector.connect("widget/index.html").await?;
//! ```

pub mod bridge;
pub mod loader;
pub mod panel;
pub mod relay;
pub mod resolver;
pub mod rewriter;
pub mod watch;

#[cfg(test)]
mod testing;

pub use bridge::{BRIDGE_MARKER, ECHO_MARKER};
pub use loader::{DEFAULT_FETCH_TIMEOUT, HttpFetcher, RemoteFetcher, RemotePolicy};
pub use relay::{WebviewConnector, WebviewConnectorBuilder};
pub use resolver::{ResolvedSource, is_remote_url};
