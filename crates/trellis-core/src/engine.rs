//! Plugin engine contract.
//!
//! The engine is a message-passing registry of plugins exposing RPC-style
//! methods. Connectors only need a tiny slice of it: `call` (to deactivate
//! themselves when their panel closes) and `emit`.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::connector::DeactivateFn;
use crate::error::EngineResult;
use crate::profile::Profile;

/// Name of the engine's built-in plugin manager.
pub const MANAGER: &str = "manager";

/// A unit registered into the engine.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Identity and exposed methods.
    fn profile(&self) -> &Profile;

    /// Called when the engine activates the plugin.
    async fn activate(&self) -> EngineResult<()> {
        Ok(())
    }

    /// Called when the engine deactivates the plugin.
    async fn deactivate(&self) {}

    /// Invokes an exposed method.
    async fn call_method(&self, method: &str, args: Vec<Value>) -> EngineResult<Value>;
}

/// Shared plugin handle.
pub type BoxedPlugin = Arc<dyn Plugin>;

/// The engine surface consumed by connectors and embedders.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Calls `method` on the plugin named `plugin`.
    async fn call(&self, plugin: &str, method: &str, args: Vec<Value>) -> EngineResult<Value>;

    /// Broadcasts an event.
    async fn emit(&self, event: &str, payload: Value);

    /// Registers one plugin.
    fn register(&self, plugin: BoxedPlugin) -> EngineResult<()>;

    /// Registers several plugins, stopping at the first failure.
    fn register_all(&self, plugins: Vec<BoxedPlugin>) -> EngineResult<()> {
        plugins.into_iter().try_for_each(|p| self.register(p))
    }

    /// Returns true if a plugin with this name is registered.
    fn is_registered(&self, name: &str) -> bool;
}

/// Builds a deactivation callback that asks the engine's manager to
/// deactivate the plugin.
///
/// Holds the engine weakly; plugins usually live inside the engine they would
/// otherwise keep alive.
pub fn deactivate_via<E>(engine: Weak<E>) -> DeactivateFn
where
    E: Engine + ?Sized + 'static,
{
    Arc::new(move |name: &str| {
        let Some(engine) = engine.upgrade() else {
            debug!(plugin = %name, "Engine dropped, skipping deactivation");
            return;
        };
        let name = name.to_string();
        tokio::spawn(async move {
            if let Err(e) = engine
                .call(MANAGER, "deactivatePlugin", vec![json!(name)])
                .await
            {
                warn!(plugin = %name, error = %e, "Failed to deactivate plugin");
            }
        });
    })
}
