//! Configuration module for the Trellis runtime.
//!
//! Layered loading (defaults, files, environment) and validation of the
//! logging, webview and engine settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ConfigProfile, load_config, load_config_from_file};
pub use schema::{
    EngineConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, TrellisConfig,
    WebviewConfig,
};
pub use validation::validate_config;
