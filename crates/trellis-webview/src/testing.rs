//! In-memory host used by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trellis_core::{
    BoxedPanel, Host, HostError, HostResult, Notice, Panel, PanelSpec, SandboxScheme,
};
use url::Url;

pub struct RecordingPanel {
    pub spec: PanelSpec,
    html: Mutex<Vec<String>>,
    posted: Mutex<Vec<Value>>,
    icon: Mutex<Option<Url>>,
    inbound: mpsc::UnboundedSender<Value>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    disposed: CancellationToken,
}

impl RecordingPanel {
    fn new(spec: PanelSpec) -> Self {
        let (inbound, receiver) = mpsc::unbounded_channel();
        Self {
            spec,
            html: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
            icon: Mutex::new(None),
            inbound,
            receiver: Mutex::new(Some(receiver)),
            disposed: CancellationToken::new(),
        }
    }

    pub fn html_history(&self) -> Vec<String> {
        self.html.lock().clone()
    }

    pub fn last_html(&self) -> Option<String> {
        self.html.lock().last().cloned()
    }

    pub fn posted(&self) -> Vec<Value> {
        self.posted.lock().clone()
    }

    pub fn icon(&self) -> Option<Url> {
        self.icon.lock().clone()
    }

    /// Simulates the content posting a message.
    pub fn push_inbound(&self, value: Value) {
        let _ = self.inbound.send(value);
    }

    /// Simulates the user closing the panel.
    pub fn close(&self) {
        self.disposed.cancel();
    }
}

impl Panel for RecordingPanel {
    fn set_html(&self, html: String) {
        self.html.lock().push(html);
    }

    fn post_message(&self, message: Value) -> HostResult<()> {
        if self.disposed.is_cancelled() {
            return Err(HostError::Disposed);
        }
        self.posted.lock().push(message);
        Ok(())
    }

    fn set_icon(&self, icon: &Url) {
        *self.icon.lock() = Some(icon.clone());
    }

    fn messages(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.receiver.lock().take()
    }

    fn disposed(&self) -> CancellationToken {
        self.disposed.clone()
    }

    fn dispose(&self) {
        self.disposed.cancel();
    }
}

#[derive(Default)]
pub struct RecordingHost {
    roots: Vec<PathBuf>,
    active_view: bool,
    reject: bool,
    no_sandbox: bool,
    panels: Mutex<Vec<Arc<RecordingPanel>>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    pub fn with_active_view(mut self, active: bool) -> Self {
        self.active_view = active;
        self
    }

    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    pub fn without_sandbox(mut self) -> Self {
        self.no_sandbox = true;
        self
    }

    pub fn panel_count(&self) -> usize {
        self.panels.lock().len()
    }

    pub fn last_panel(&self) -> Option<Arc<RecordingPanel>> {
        self.panels.lock().last().cloned()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Host for RecordingHost {
    fn create_panel(&self, spec: PanelSpec) -> HostResult<BoxedPanel> {
        if self.reject {
            return Err(HostError::PanelRejected("test host rejects panels".into()));
        }
        let panel = Arc::new(RecordingPanel::new(spec));
        self.panels.lock().push(panel.clone());
        Ok(panel)
    }

    fn workspace_roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    fn has_active_view(&self) -> bool {
        self.active_view
    }

    fn sandbox_uri(&self, path: &Path) -> Option<String> {
        if self.no_sandbox {
            return None;
        }
        SandboxScheme::default().encode(path)
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
