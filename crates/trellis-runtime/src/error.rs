//! Runtime error types.

use thiserror::Error;
use trellis_core::{ConnectorError, EngineError};

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping or driving the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The engine rejected an operation.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A connector failed outside of an engine call.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
