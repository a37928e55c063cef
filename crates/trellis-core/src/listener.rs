//! Owned listener handles with idempotent cancellation.
//!
//! A connector keeps every subscription it creates at connect time in a single
//! [`ListenerSet`]. Tearing down means cancelling the set: each handle fires its
//! token once, drops whatever resource it owns (a file watcher, for example),
//! and detaches its task. Handles cancel themselves on drop, so no listener
//! can outlive its owner.

use std::any::Any;
use std::fmt;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One active subscription.
pub struct ListenerHandle {
    name: &'static str,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    guard: Option<Box<dyn Any + Send>>,
    cancelled: bool,
}

impl ListenerHandle {
    /// Creates a handle governed by `token`.
    pub fn new(name: &'static str, token: CancellationToken) -> Self {
        Self {
            name,
            token,
            task: None,
            guard: None,
            cancelled: false,
        }
    }

    /// Attaches the task servicing this listener.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Attaches a resource that must live exactly as long as the listener.
    pub fn with_guard<G: Any + Send>(mut self, guard: G) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once [`cancel`](Self::cancel) ran.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Cancels the listener. Returns false if it was already cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        self.token.cancel();
        self.guard.take();
        // The task observes the token; it is detached rather than aborted so a
        // listener may tear down its own connector.
        self.task.take();
        trace!(listener = self.name, "Listener cancelled");
        true
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("name", &self.name)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// The listeners owned by one connector.
#[derive(Debug, Default)]
pub struct ListenerSet {
    handles: Vec<ListenerHandle>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: ListenerHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Names of the registered listeners, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(ListenerHandle::name).collect()
    }

    /// Cancels every listener and clears the set. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        self.handles
            .drain(..)
            .map(|mut handle| handle.cancel())
            .filter(|cancelled| *cancelled)
            .count()
    }
}
