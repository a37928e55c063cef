//! In-process reference engine.
//!
//! [`LocalEngine`] keeps a registry of plugins and answers calls addressed to
//! them. Calls to [`MANAGER`] are handled by the engine itself:
//!
//! | Method             | Argument      | Result                     |
//! |--------------------|---------------|----------------------------|
//! | `activatePlugin`   | plugin name   | `true` once active         |
//! | `deactivatePlugin` | plugin name   | `true` if it was active    |
//! | `isActive`         | plugin name   | whether it is active       |
//!
//! Events passed to [`Engine::emit`] are broadcast to every
//! [`subscribe`](LocalEngine::subscribe)r.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use trellis_core::{BoxedPlugin, Engine, EngineError, EngineResult, MANAGER};

use crate::config::EngineConfig;

const EVENT_CAPACITY: usize = 64;

/// Event emitted by the engine itself when a plugin is activated.
pub const PLUGIN_ACTIVATED: &str = "pluginActivated";
/// Event emitted by the engine itself when a plugin is deactivated.
pub const PLUGIN_DEACTIVATED: &str = "pluginDeactivated";

/// A broadcast event.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub event: String,
    pub payload: Value,
}

struct Entry {
    plugin: BoxedPlugin,
    active: bool,
}

/// Registry-backed [`Engine`].
pub struct LocalEngine {
    plugins: RwLock<HashMap<String, Entry>>,
    events: broadcast::Sender<EngineEvent>,
    call_timeout: Duration,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEngine {
    /// Creates an empty engine with the default call timeout.
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            plugins: RwLock::new(HashMap::new()),
            events,
            call_timeout: config.call_timeout(),
        }
    }

    /// How long connector-backed plugins built for this engine wait for answers.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Subscribes to emitted events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Names of the active plugins, sorted.
    pub fn active_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .read()
            .iter()
            .filter(|(_, entry)| entry.active)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Returns true if `name` is registered and active.
    pub fn is_active(&self, name: &str) -> bool {
        self.plugins.read().get(name).is_some_and(|e| e.active)
    }

    fn lookup(&self, name: &str) -> EngineResult<(BoxedPlugin, bool)> {
        self.plugins
            .read()
            .get(name)
            .map(|entry| (entry.plugin.clone(), entry.active))
            .ok_or_else(|| EngineError::PluginNotFound(name.to_string()))
    }

    fn set_active(&self, name: &str, active: bool) -> bool {
        match self.plugins.write().get_mut(name) {
            Some(entry) => std::mem::replace(&mut entry.active, active),
            None => false,
        }
    }

    fn broadcast(&self, event: &str, payload: Value) {
        let receivers = self
            .events
            .send(EngineEvent {
                event: event.to_string(),
                payload,
            })
            .unwrap_or(0);
        trace!(event = %event, receivers, "Event emitted");
    }

    async fn activate(&self, name: &str) -> EngineResult<Value> {
        let (plugin, active) = self.lookup(name)?;
        if active {
            return Ok(Value::Bool(true));
        }
        plugin.activate().await?;
        self.set_active(name, true);
        info!(plugin = %name, "Plugin activated");
        self.broadcast(PLUGIN_ACTIVATED, Value::String(name.to_string()));
        Ok(Value::Bool(true))
    }

    async fn deactivate(&self, name: &str) -> EngineResult<Value> {
        let (plugin, _) = self.lookup(name)?;
        // Flip the flag first so a deactivation triggered from inside
        // `plugin.deactivate()` finds nothing left to do.
        if !self.set_active(name, false) {
            return Ok(Value::Bool(false));
        }
        plugin.deactivate().await;
        info!(plugin = %name, "Plugin deactivated");
        self.broadcast(PLUGIN_DEACTIVATED, Value::String(name.to_string()));
        Ok(Value::Bool(true))
    }

    async fn call_manager(&self, method: &str, args: &[Value]) -> EngineResult<Value> {
        let target = || {
            args.first().and_then(Value::as_str).ok_or_else(|| {
                EngineError::InvalidArguments(format!("{method} expects a plugin name"))
            })
        };
        match method {
            "activatePlugin" => self.activate(target()?).await,
            "deactivatePlugin" => self.deactivate(target()?).await,
            "isActive" => Ok(Value::Bool(self.is_active(target()?))),
            _ => Err(EngineError::MethodNotFound {
                plugin: MANAGER.to_string(),
                method: method.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Engine for LocalEngine {
    async fn call(&self, plugin: &str, method: &str, args: Vec<Value>) -> EngineResult<Value> {
        debug!(plugin = %plugin, method = %method, "Engine call");
        if plugin == MANAGER {
            return self.call_manager(method, &args).await;
        }

        let (target, active) = self.lookup(plugin)?;
        if !active {
            return Err(EngineError::NotActive(plugin.to_string()));
        }
        if !target.profile().exposes(method) {
            return Err(EngineError::MethodNotFound {
                plugin: plugin.to_string(),
                method: method.to_string(),
            });
        }
        target.call_method(method, args).await
    }

    async fn emit(&self, event: &str, payload: Value) {
        self.broadcast(event, payload);
    }

    fn register(&self, plugin: BoxedPlugin) -> EngineResult<()> {
        let name = plugin.profile().name.clone();
        let mut plugins = self.plugins.write();
        if name == MANAGER || plugins.contains_key(&name) {
            warn!(plugin = %name, "Plugin already registered");
            return Err(EngineError::AlreadyRegistered(name));
        }
        debug!(plugin = %name, "Plugin registered");
        plugins.insert(
            name,
            Entry {
                plugin,
                active: false,
            },
        );
        Ok(())
    }

    fn is_registered(&self, name: &str) -> bool {
        name == MANAGER || self.plugins.read().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use trellis_core::{Plugin, Profile};

    struct Counter {
        profile: Profile,
        activations: AtomicUsize,
        deactivations: AtomicUsize,
    }

    impl Counter {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                profile: Profile::new(name).with_methods(["add"]),
                activations: AtomicUsize::new(0),
                deactivations: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Plugin for Counter {
        fn profile(&self) -> &Profile {
            &self.profile
        }

        async fn activate(&self) -> EngineResult<()> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn deactivate(&self) {
            self.deactivations.fetch_add(1, Ordering::SeqCst);
        }

        async fn call_method(&self, _method: &str, args: Vec<Value>) -> EngineResult<Value> {
            let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
            Ok(json!(sum))
        }
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let engine = LocalEngine::new();
        let counter = Counter::new("counter");
        engine.register(counter.clone()).unwrap();
        assert!(engine.is_registered("counter"));
        assert!(engine.is_registered(MANAGER));

        let err = engine.call("counter", "add", vec![]).await.unwrap_err();
        assert!(matches!(err, EngineError::NotActive(_)));

        engine
            .call(MANAGER, "activatePlugin", vec![json!("counter")])
            .await
            .unwrap();
        let sum = engine
            .call("counter", "add", vec![json!(2), json!(3)])
            .await
            .unwrap();
        assert_eq!(sum, json!(5));
        assert_eq!(engine.active_plugins(), vec!["counter".to_string()]);
    }

    #[tokio::test]
    async fn test_call_errors() {
        let engine = LocalEngine::new();
        engine.register(Counter::new("counter")).unwrap();
        engine
            .call(MANAGER, "activatePlugin", vec![json!("counter")])
            .await
            .unwrap();

        assert!(matches!(
            engine.call("missing", "add", vec![]).await,
            Err(EngineError::PluginNotFound(_))
        ));
        assert!(matches!(
            engine.call("counter", "sub", vec![]).await,
            Err(EngineError::MethodNotFound { .. })
        ));
        assert!(matches!(
            engine.call(MANAGER, "activatePlugin", vec![json!(1)]).await,
            Err(EngineError::InvalidArguments(_))
        ));
        assert!(matches!(
            engine.call(MANAGER, "reboot", vec![]).await,
            Err(EngineError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let engine = LocalEngine::new();
        engine.register(Counter::new("counter")).unwrap();
        assert!(matches!(
            engine.register(Counter::new("counter")),
            Err(EngineError::AlreadyRegistered(_))
        ));
        assert!(engine.register(Counter::new(MANAGER)).is_err());
        assert!(
            engine
                .register_all(vec![Counter::new("a") as BoxedPlugin, Counter::new("a")])
                .is_err()
        );
        assert!(engine.is_registered("a"));
    }

    #[tokio::test]
    async fn test_activation_is_idempotent() {
        let engine = LocalEngine::new();
        let counter = Counter::new("counter");
        engine.register(counter.clone()).unwrap();

        for _ in 0..2 {
            engine
                .call(MANAGER, "activatePlugin", vec![json!("counter")])
                .await
                .unwrap();
        }
        assert_eq!(counter.activations.load(Ordering::SeqCst), 1);

        let first = engine
            .call(MANAGER, "deactivatePlugin", vec![json!("counter")])
            .await
            .unwrap();
        let second = engine
            .call(MANAGER, "deactivatePlugin", vec![json!("counter")])
            .await
            .unwrap();
        assert_eq!((first, second), (json!(true), json!(false)));
        assert_eq!(counter.deactivations.load(Ordering::SeqCst), 1);
        assert_eq!(
            engine
                .call(MANAGER, "isActive", vec![json!("counter")])
                .await
                .unwrap(),
            json!(false)
        );
    }

    #[tokio::test]
    async fn test_events_broadcast() {
        let engine = LocalEngine::new();
        let mut events = engine.subscribe();
        engine.register(Counter::new("counter")).unwrap();
        engine
            .call(MANAGER, "activatePlugin", vec![json!("counter")])
            .await
            .unwrap();
        engine.emit("themeChanged", json!({"dark": true})).await;

        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent {
                event: PLUGIN_ACTIVATED.into(),
                payload: json!("counter"),
            }
        );
        assert_eq!(events.recv().await.unwrap().event, "themeChanged");
    }
}
