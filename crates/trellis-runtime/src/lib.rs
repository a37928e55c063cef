//! Trellis Runtime - configuration, logging and a reference engine.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, [`TrellisConfig`])
//! - Logging setup on `tracing-subscriber` ([`logging::init_from_config`])
//! - An in-process plugin engine ([`LocalEngine`])
//! - Connector-backed plugins ([`ConnectorPlugin`], [`WebviewPlugin`])
//!
//! ```ignore
//! use std::sync::Arc;
//! use trellis_runtime::prelude::*;
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! let engine = Arc::new(LocalEngine::from_config(&config.engine));
//! let builder = config.webview.connector_builder(profile, host, Some(context));
//! let plugin = WebviewPlugin::from_builder(&engine, builder);
//! engine.register(plugin)?;
//! engine.call(MANAGER, "activatePlugin", vec!["my-widget".into()]).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod plugin;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, TrellisConfig, load_config, load_config_from_file,
};
pub use engine::{EngineEvent, LocalEngine};
pub use error::{RuntimeError, RuntimeResult};
pub use plugin::{ConnectorPlugin, WebviewPlugin};

/// Re-export of `tracing` so embedders log through the same facade.
pub use tracing;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::{TrellisConfig, load_config};
    pub use crate::engine::LocalEngine;
    pub use crate::logging;
    pub use crate::plugin::WebviewPlugin;
    pub use trellis_core::prelude::*;
    pub use trellis_core::MANAGER;
}
