//! Connector configuration values.
//!
//! [`ConnectorOptions`] is an immutable value. Updating it never mutates a
//! shared object: [`ConnectorOptions::merged`] builds a new value from the old
//! one and an [`OptionsPatch`], with the patch's fields taking precedence.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Base directory used for relative local sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeTo {
    /// First workspace root.
    Workspace,
    /// Extension installation directory.
    #[default]
    Extension,
}

/// Panel placement hint understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewColumn {
    /// The currently active column.
    Active,
    /// A new column beside the active one.
    Beside,
    /// A fixed, 1-based column.
    Index(u8),
}

impl ViewColumn {
    /// The first column.
    pub const ONE: Self = Self::Index(1);
}

/// Handle to host-managed resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostContext {
    /// Extension installation directory.
    pub extension_path: PathBuf,
}

impl HostContext {
    /// Creates a context for the given extension directory.
    pub fn new(extension_path: impl Into<PathBuf>) -> Self {
        Self {
            extension_path: extension_path.into(),
        }
    }
}

/// Configuration of a single connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorOptions {
    /// Required for local resolution relative to the extension.
    #[serde(default)]
    pub context: Option<HostContext>,
    /// Base for relative local sources.
    #[serde(default)]
    pub relative_to: RelativeTo,
    /// Explicit placement; overrides the profile's location.
    #[serde(default)]
    pub column: Option<ViewColumn>,
    /// Reload local content whenever `index.html` changes.
    #[serde(default)]
    pub dev_mode: bool,
}

impl ConnectorOptions {
    /// Sets the host context.
    pub fn with_context(mut self, context: HostContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the relative base.
    pub fn with_relative_to(mut self, relative_to: RelativeTo) -> Self {
        self.relative_to = relative_to;
        self
    }

    /// Sets the explicit column.
    pub fn with_column(mut self, column: ViewColumn) -> Self {
        self.column = Some(column);
        self
    }

    /// Enables or disables dev mode.
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Returns a new value with every field present in `patch` overridden.
    pub fn merged(&self, patch: OptionsPatch) -> Self {
        Self {
            context: patch.context.or_else(|| self.context.clone()),
            relative_to: patch.relative_to.unwrap_or(self.relative_to),
            column: patch.column.or(self.column),
            dev_mode: patch.dev_mode.unwrap_or(self.dev_mode),
        }
    }
}

/// Partial options; `None` fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsPatch {
    #[serde(default)]
    pub context: Option<HostContext>,
    #[serde(default)]
    pub relative_to: Option<RelativeTo>,
    #[serde(default)]
    pub column: Option<ViewColumn>,
    #[serde(default)]
    pub dev_mode: Option<bool>,
}

impl OptionsPatch {
    pub fn context(mut self, context: HostContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn relative_to(mut self, relative_to: RelativeTo) -> Self {
        self.relative_to = Some(relative_to);
        self
    }

    pub fn column(mut self, column: ViewColumn) -> Self {
        self.column = Some(column);
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = Some(dev_mode);
        self
    }
}
