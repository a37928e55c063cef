//! The webview connector.
//!
//! [`WebviewConnector`] ties the pieces together: it resolves the source,
//! loads the document, opens a panel and relays messages both ways until the
//! panel goes away.
//!
//! ```text
//! connect(url)
//!   ├─ resolve ──▶ Local { base } | Remote { url, base }
//!   ├─ load    ──▶ rewrite links + inject bridge (or wrap / fetch)
//!   ├─ open    ──▶ Host::create_panel + icon
//!   └─ listen  ──▶ "message" ─▶ handler
//!                  "disposed" ─▶ teardown + deactivate
//!                  "dev-reload" (dev mode, local only)
//! ```
//!
//! Every connect attempt gets a fresh epoch. Teardown bumps the epoch, so a
//! listener or an in-flight attempt belonging to an older session can never
//! touch the current one.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use trellis_core::{
    BoxedHost, BoxedPanel, ConnectError, ConnectionState, Connector, ConnectorError,
    ConnectorOptions, ConnectorResult, DeactivateFn, ListenerHandle, ListenerSet, Message,
    MessageHandler, OptionsPatch, Profile,
};

use crate::loader::{
    DEFAULT_FETCH_TIMEOUT, HttpFetcher, RemoteFetcher, RemotePolicy, load_local, load_remote,
};
use crate::panel::open_panel;
use crate::resolver::{ResolvedSource, resolve};
use crate::watch::watch_index;

// =============================================================================
// Session
// =============================================================================

#[derive(Default)]
struct Session {
    state: ConnectionState,
    epoch: u64,
    panel: Option<BoxedPanel>,
    listeners: ListenerSet,
}

impl Session {
    /// Ends the current session; the returned parts are released outside the lock.
    fn take(&mut self) -> Released {
        self.epoch += 1;
        self.state = ConnectionState::Disconnected;
        Released {
            panel: self.panel.take(),
            listeners: std::mem::take(&mut self.listeners),
        }
    }
}

struct Released {
    panel: Option<BoxedPanel>,
    listeners: ListenerSet,
}

impl Released {
    fn has_panel(&self) -> bool {
        self.panel.is_some()
    }

    /// Cancels listeners first, then disposes the panel.
    fn release(mut self) -> usize {
        let cancelled = self.listeners.cancel_all();
        if let Some(panel) = self.panel.take() {
            panel.dispose();
        }
        cancelled
    }
}

// =============================================================================
// Inner
// =============================================================================

struct Inner {
    profile: Profile,
    host: BoxedHost,
    options: RwLock<Arc<ConnectorOptions>>,
    remote_policy: RemotePolicy,
    fetcher: Arc<dyn RemoteFetcher>,
    on_message: MessageHandler,
    on_deactivate: Option<DeactivateFn>,
    session: Mutex<Session>,
}

impl Inner {
    fn options(&self) -> Arc<ConnectorOptions> {
        self.options.read().clone()
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.session.lock().epoch == epoch
    }

    fn cancelled(&self) -> ConnectorError {
        ConnectorError::Cancelled {
            plugin: self.profile.name.clone(),
        }
    }

    fn receive(&self, raw: Value) {
        match Message::from_value(raw) {
            Some(message) => (self.on_message)(message),
            None => warn!(plugin = %self.profile.name, "Dropping inbound message that is not an object"),
        }
    }

    fn send(&self, message: Message) {
        let panel = self.session.lock().panel.clone();
        let Some(panel) = panel else {
            trace!(plugin = %self.profile.name, "Not connected, message dropped");
            return;
        };
        if let Err(e) = panel.post_message(message.into_value()) {
            warn!(plugin = %self.profile.name, error = %e, "Failed to post message");
        }
    }

    fn disconnect(&self) {
        let released = self.session.lock().take();
        if !released.has_panel() {
            return;
        }
        let cancelled = released.release();
        info!(plugin = %self.profile.name, listeners = cancelled, "Disconnected");
    }

    fn on_panel_disposed(&self, epoch: u64) {
        let released = {
            let mut session = self.session.lock();
            if session.epoch != epoch {
                return;
            }
            session.take()
        };
        released.release();
        info!(plugin = %self.profile.name, "Panel closed by host");

        if let Some(deactivate) = &self.on_deactivate {
            deactivate(&self.profile.name);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.session.get_mut().take().release();
    }
}

/// Resets a `Connecting` session when an attempt ends without installing a panel,
/// including when the connect future is dropped.
struct AttemptGuard<'a> {
    inner: &'a Inner,
    epoch: u64,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.inner.session.lock();
        if session.epoch == self.epoch && session.state == ConnectionState::Connecting {
            session.state = ConnectionState::Disconnected;
        }
    }
}

// =============================================================================
// Listeners
// =============================================================================

fn listen_messages(inner: Weak<Inner>, panel: &BoxedPanel) -> ListenerHandle {
    let token = CancellationToken::new();
    let Some(mut messages) = panel.messages() else {
        warn!("Panel message stream already taken");
        return ListenerHandle::new("message", token);
    };

    let task = tokio::spawn({
        let token = token.clone();
        async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    raw = messages.recv() => {
                        let (Some(raw), Some(inner)) = (raw, inner.upgrade()) else {
                            break;
                        };
                        inner.receive(raw);
                    }
                }
            }
        }
    });
    ListenerHandle::new("message", token).with_task(task)
}

fn listen_disposed(inner: Weak<Inner>, panel: &BoxedPanel, epoch: u64) -> ListenerHandle {
    let token = CancellationToken::new();
    let disposed = panel.disposed();

    let task = tokio::spawn({
        let token = token.clone();
        async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = disposed.cancelled() => {
                    if let Some(inner) = inner.upgrade() {
                        inner.on_panel_disposed(epoch);
                    }
                }
            }
        }
    });
    ListenerHandle::new("disposed", token).with_task(task)
}

// =============================================================================
// WebviewConnector
// =============================================================================

/// Connector that renders plugin content in a host webview panel.
///
/// # Example
///
/// ```ignore
/// let connector = WebviewConnector::builder(profile, host)
///     .options(ConnectorOptions::default().with_context(HostContext::new("/ext")))
///     .on_message(Arc::new(|msg| println!("{msg:?}")))
///     .build();
/// connector.connect("widget/index.html").await?;
/// ```
pub struct WebviewConnector {
    inner: Arc<Inner>,
}

impl WebviewConnector {
    /// Starts building a connector for `profile`.
    pub fn builder(profile: Profile, host: BoxedHost) -> WebviewConnectorBuilder {
        WebviewConnectorBuilder::new(profile, host)
    }

    /// Current options snapshot.
    pub fn options(&self) -> Arc<ConnectorOptions> {
        self.inner.options()
    }

    /// Replaces the options with `patch` applied over the current value.
    ///
    /// Takes effect on the next [`connect`](Connector::connect).
    pub fn set_options(&self, patch: OptionsPatch) {
        let mut options = self.inner.options.write();
        *options = Arc::new(options.merged(patch));
    }

    pub fn remote_policy(&self) -> RemotePolicy {
        self.inner.remote_policy
    }

    /// The live panel, if connected.
    pub fn panel(&self) -> Option<BoxedPanel> {
        self.inner.session.lock().panel.clone()
    }

    /// Names of the active listeners, in registration order.
    pub fn listener_names(&self) -> Vec<&'static str> {
        self.inner.session.lock().listeners.names()
    }

    async fn establish(&self, url: &str, epoch: u64) -> ConnectorResult<()> {
        let inner = &self.inner;
        let options = inner.options();
        let host = inner.host.as_ref();

        let source = resolve(url, &options, &inner.profile, host)?;
        let html = match &source {
            ResolvedSource::Local { base, .. } => load_local(base, host).await?,
            ResolvedSource::Remote { url, base, .. } => {
                load_remote(url, base, inner.remote_policy, inner.fetcher.as_ref()).await?
            }
        };

        if !inner.is_current(epoch) {
            return Err(inner.cancelled());
        }

        let panel =
            open_panel(&inner.profile, &options, &source, host).map_err(ConnectError::from)?;
        panel.set_html(html);

        let mut listeners = ListenerSet::new();
        listeners.push(listen_messages(Arc::downgrade(inner), &panel));
        listeners.push(listen_disposed(Arc::downgrade(inner), &panel, epoch));

        if options.dev_mode {
            match &source {
                ResolvedSource::Local { base, .. } => {
                    match watch_index(
                        base.clone(),
                        panel.clone(),
                        inner.host.clone(),
                        CancellationToken::new(),
                    ) {
                        Ok(handle) => listeners.push(handle),
                        Err(e) => warn!(plugin = %inner.profile.name, error = %e, "Dev mode watch failed"),
                    }
                }
                ResolvedSource::Remote { .. } => {
                    debug!(plugin = %inner.profile.name, "Dev mode has no effect on remote content");
                }
            }
        }

        let mut session = inner.session.lock();
        if session.epoch != epoch {
            drop(session);
            listeners.cancel_all();
            panel.dispose();
            return Err(inner.cancelled());
        }

        let count = listeners.len();
        session.panel = Some(panel);
        session.listeners = listeners;
        session.state = ConnectionState::Connected;
        drop(session);

        info!(
            plugin = %inner.profile.name,
            remote = source.is_remote(),
            listeners = count,
            "Connected"
        );
        Ok(())
    }
}

#[async_trait]
impl Connector for WebviewConnector {
    fn profile(&self) -> &Profile {
        &self.inner.profile
    }

    fn state(&self) -> ConnectionState {
        self.inner.session.lock().state
    }

    async fn connect(&self, url: &str) -> ConnectorResult<()> {
        let (epoch, previous) = {
            let mut session = self.inner.session.lock();
            if session.state == ConnectionState::Connecting {
                return Err(ConnectorError::AlreadyConnecting {
                    plugin: self.inner.profile.name.clone(),
                });
            }
            let previous = (session.state == ConnectionState::Connected).then(|| session.take());
            session.epoch += 1;
            session.state = ConnectionState::Connecting;
            (session.epoch, previous)
        };

        if let Some(previous) = previous {
            previous.release();
            debug!(plugin = %self.inner.profile.name, "Previous session torn down");
        }

        let _guard = AttemptGuard {
            inner: &self.inner,
            epoch,
        };
        debug!(plugin = %self.inner.profile.name, url = %url, "Connecting");

        let result = self.establish(url, epoch).await;
        if let Err(e) = &result {
            warn!(plugin = %self.inner.profile.name, url = %url, error = %e, "Connect failed");
        }
        result
    }

    fn send(&self, message: Message) {
        self.inner.send(message);
    }

    fn receive(&self, raw: Value) {
        self.inner.receive(raw);
    }

    fn disconnect(&self) {
        self.inner.disconnect();
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`WebviewConnector`].
pub struct WebviewConnectorBuilder {
    profile: Profile,
    host: BoxedHost,
    options: ConnectorOptions,
    remote_policy: RemotePolicy,
    fetch_timeout: Duration,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
    on_message: Option<MessageHandler>,
    on_deactivate: Option<DeactivateFn>,
}

impl WebviewConnectorBuilder {
    fn new(profile: Profile, host: BoxedHost) -> Self {
        Self {
            profile,
            host,
            options: ConnectorOptions::default(),
            remote_policy: RemotePolicy::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetcher: None,
            on_message: None,
            on_deactivate: None,
        }
    }

    pub fn options(mut self, options: ConnectorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn remote_policy(mut self, policy: RemotePolicy) -> Self {
        self.remote_policy = policy;
        self
    }

    /// Timeout of the default HTTP fetcher. Ignored when a custom fetcher is set.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Handler receiving every inbound message.
    pub fn on_message(mut self, handler: MessageHandler) -> Self {
        self.on_message = Some(handler);
        self
    }

    /// Callback invoked when the host closes the panel.
    pub fn on_deactivate(mut self, callback: DeactivateFn) -> Self {
        self.on_deactivate = Some(callback);
        self
    }

    pub fn build(self) -> WebviewConnector {
        let fetch_timeout = self.fetch_timeout;
        let on_message = self.on_message.unwrap_or_else(|| {
            Arc::new(|message: Message| debug!(?message, "Inbound message without handler"))
        });

        WebviewConnector {
            inner: Arc::new(Inner {
                profile: self.profile,
                host: self.host,
                options: RwLock::new(Arc::new(self.options)),
                remote_policy: self.remote_policy,
                fetcher: self
                    .fetcher
                    .unwrap_or_else(|| Arc::new(HttpFetcher::new(fetch_timeout))),
                on_message,
                on_deactivate: self.on_deactivate,
                session: Mutex::new(Session::default()),
            }),
        }
    }
}
