//! Connector-backed plugins.
//!
//! [`ConnectorPlugin`] registers a [`Connector`] into an engine. Activation
//! connects to `profile.url`, deactivation disconnects, and calls into the
//! plugin travel over the connector as `request` messages:
//!
//! ```text
//! engine ──call──▶ {action:"request",  name, key, id, payload:[args]} ──▶ content
//! engine ◀──────── {action:"response", name, key, id, payload | error} ◀── content
//! ```
//!
//! The content may also call into the engine with its own `request` messages
//! and broadcast events with `emit`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};
use trellis_core::{
    ConnectionState, Connector, DeactivateFn, Engine, EngineError, EngineResult, Message,
    MessageHandler, Plugin, Profile, deactivate_via,
};
use trellis_webview::{WebviewConnector, WebviewConnectorBuilder};

use crate::engine::LocalEngine;

type Reply = Result<Value, String>;
type Event = (String, Value);

/// Plugin whose content lives behind a connector.
pub struct ConnectorPlugin<C> {
    connector: C,
    engine: Weak<dyn Engine>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    next_id: AtomicU64,
    call_timeout: Duration,
    events: OnceLock<mpsc::UnboundedSender<Event>>,
}

/// A webview panel registered as a plugin.
pub type WebviewPlugin = ConnectorPlugin<WebviewConnector>;

impl<C: Connector + 'static> ConnectorPlugin<C> {
    /// Creates the plugin around the connector returned by `build`.
    ///
    /// `build` receives the handler the connector must deliver inbound
    /// messages to, and the callback it must invoke when its panel is closed
    /// by the host.
    pub fn new<E, F>(engine: &Arc<E>, call_timeout: Duration, build: F) -> Arc<Self>
    where
        E: Engine + 'static,
        F: FnOnce(MessageHandler, DeactivateFn) -> C,
    {
        let engine: Weak<dyn Engine> = Arc::downgrade(engine) as Weak<dyn Engine>;
        Arc::new_cyclic(|this: &Weak<Self>| {
            let this = this.clone();
            let handler: MessageHandler = Arc::new(move |message: Message| {
                if let Some(plugin) = this.upgrade() {
                    plugin.on_message(message);
                }
            });
            let connector = build(handler, deactivate_via(engine.clone()));
            Self {
                connector,
                engine,
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                call_timeout,
                events: OnceLock::new(),
            }
        })
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Calls still waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().len()
    }

    fn name(&self) -> &str {
        self.connector.name()
    }

    fn on_message(self: &Arc<Self>, message: Message) {
        match message.action() {
            Some("response") => self.on_response(&message),
            Some("request") => {
                let this = self.clone();
                tokio::spawn(async move { this.on_request(message).await });
            }
            Some("emit") | Some("notification") => {
                let Some(event) = message.key().map(str::to_string) else {
                    warn!(plugin = %self.name(), "Dropping emit without key");
                    return;
                };
                let payload = message.payload().cloned().unwrap_or(Value::Null);
                self.forward_event(event, payload);
            }
            other => debug!(plugin = %self.name(), action = ?other, "Ignoring message"),
        }
    }

    /// Queues an event for the engine. A single task drains the queue, so
    /// events reach the engine in the order the content emitted them.
    fn forward_event(&self, event: String, payload: Value) {
        let events = self.events.get_or_init(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
            let engine = self.engine.clone();
            tokio::spawn(async move {
                while let Some((event, payload)) = rx.recv().await {
                    let Some(engine) = engine.upgrade() else {
                        break;
                    };
                    engine.emit(&event, payload).await;
                }
            });
            tx
        });
        if events.send((event, payload)).is_err() {
            debug!(plugin = %self.name(), "Engine gone, event dropped");
        }
    }

    fn on_response(&self, message: &Message) {
        let Some(id) = message.id() else {
            warn!(plugin = %self.name(), "Dropping response without id");
            return;
        };
        let Some(tx) = self.pending.lock().remove(&id) else {
            warn!(plugin = %self.name(), id, "Response for unknown call (timed out?)");
            return;
        };
        let reply = match message.error() {
            Some(error) => Err(error.to_string()),
            None => Ok(message.payload().cloned().unwrap_or(Value::Null)),
        };
        let _ = tx.send(reply);
    }

    async fn on_request(&self, message: Message) {
        let (Some(target), Some(method)) = (message.name(), message.key()) else {
            warn!(plugin = %self.name(), "Dropping request without name or key");
            return;
        };
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        debug!(
            plugin = %self.name(),
            target = %target,
            method = %method,
            from = ?message.request_info(),
            "Request from content"
        );

        let args = match message.payload() {
            Some(Value::Array(args)) => args.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        };
        let mut reply = Message::new()
            .with("action", "response")
            .with("name", target)
            .with("key", method);
        if let Some(id) = message.id() {
            reply = reply.with("id", id);
        }
        reply = match engine.call(target, method, args).await {
            Ok(payload) => reply.with("payload", payload),
            Err(e) => reply.with("error", e.to_string()),
        };
        self.connector.send(reply);
    }
}

impl WebviewPlugin {
    /// Builds a webview plugin for `engine` with its call timeout.
    pub fn from_builder(
        engine: &Arc<LocalEngine>,
        builder: WebviewConnectorBuilder,
    ) -> Arc<Self> {
        Self::new(engine, engine.call_timeout(), |handler, deactivate| {
            builder.on_message(handler).on_deactivate(deactivate).build()
        })
    }
}

#[async_trait]
impl<C: Connector + 'static> Plugin for ConnectorPlugin<C> {
    fn profile(&self) -> &Profile {
        self.connector.profile()
    }

    async fn activate(&self) -> EngineResult<()> {
        let Some(url) = self.connector.profile().url.clone() else {
            return Err(EngineError::InvalidArguments(format!(
                "plugin '{}' has no url",
                self.name()
            )));
        };
        self.connector.connect(&url).await?;
        Ok(())
    }

    async fn deactivate(&self) {
        self.connector.disconnect();
        // Dropping the senders fails every waiting call with `NotConnected`.
        self.pending.lock().clear();
    }

    async fn call_method(&self, method: &str, args: Vec<Value>) -> EngineResult<Value> {
        if self.connector.state() != ConnectionState::Connected {
            return Err(EngineError::NotConnected(self.name().to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        debug!(plugin = %self.name(), method = %method, id, "Calling content");
        self.connector.send(
            Message::new()
                .with("action", "request")
                .with("name", self.name())
                .with("key", method)
                .with("id", id)
                .with("payload", args),
        );

        match timeout(self.call_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(error))) => Err(EngineError::Remote(error)),
            Ok(Err(_)) => Err(EngineError::NotConnected(self.name().to_string())),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(EngineError::Timeout {
                    plugin: self.name().to_string(),
                    method: method.to_string(),
                })
            }
        }
    }
}
