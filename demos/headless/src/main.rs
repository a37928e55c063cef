//! Headless Host Example
//!
//! Runs a Trellis webview plugin without a UI toolkit. The "panel" is the
//! terminal:
//!
//! - the rendered document is written to `--dump` (or only its size is logged)
//! - messages posted into the panel are printed to stdout, one JSON per line
//! - every JSON line typed on stdin is delivered as a message from the content
//!
//! Closing stdin closes the panel, which deactivates the plugin.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package headless -- --call increment
//! # then answer the printed request, e.g.
//! {"action":"response","name":"counter","key":"increment","id":1,"payload":1}
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trellis::core::{BoxedPanel, HostError, HostResult};
use trellis::prelude::*;
use trellis::runtime::config::{ConfigLoader, TrellisConfig};
use url::Url;

#[derive(Parser, Debug)]
#[command(about = "Drive a Trellis webview plugin from the terminal")]
struct Args {
    /// Configuration file; defaults to trellis.toml lookup.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory local sources are resolved against.
    #[arg(long, default_value = env!("CARGO_MANIFEST_DIR"))]
    extension: PathBuf,

    /// Plugin content location, local path or http(s) URL.
    #[arg(long, default_value = "widget/index.html")]
    url: String,

    /// Reload the panel when index.html changes.
    #[arg(long)]
    dev: bool,

    /// Method to call on the plugin once it is active.
    #[arg(long)]
    call: Option<String>,

    /// Write every rendered document to this file.
    #[arg(long)]
    dump: Option<PathBuf>,
}

// ============================================================================
// Console host
// ============================================================================

struct ConsolePanel {
    title: String,
    dump: Option<PathBuf>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    disposed: CancellationToken,
}

impl Panel for ConsolePanel {
    fn set_html(&self, html: String) {
        info!(panel = %self.title, bytes = html.len(), "Document rendered");
        if let Some(path) = &self.dump
            && let Err(e) = std::fs::write(path, &html)
        {
            warn!(path = %path.display(), error = %e, "Failed to dump document");
        }
    }

    fn post_message(&self, message: Value) -> HostResult<()> {
        if self.disposed.is_cancelled() {
            return Err(HostError::Disposed);
        }
        println!("{message}");
        Ok(())
    }

    fn set_icon(&self, icon: &Url) {
        debug!(panel = %self.title, icon = %icon, "Icon set");
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

/// Routes stdin to whichever panel was created last.
#[derive(Default)]
struct ConsoleHost {
    dump: Option<PathBuf>,
    current: Mutex<Option<(mpsc::UnboundedSender<Value>, CancellationToken)>>,
}

impl ConsoleHost {
    fn deliver(&self, message: Value) {
        match &*self.current.lock() {
            Some((inbound, _)) => {
                let _ = inbound.send(message);
            }
            None => warn!("No panel open, input dropped"),
        }
    }

    fn close(&self) {
        if let Some((_, disposed)) = self.current.lock().take() {
            disposed.cancel();
        }
    }
}

impl Host for ConsoleHost {
    fn create_panel(&self, spec: PanelSpec) -> HostResult<BoxedPanel> {
        let (inbound, receiver) = mpsc::unbounded_channel();
        let disposed = CancellationToken::new();
        info!(panel = %spec.title, column = ?spec.column, "Panel created");

        *self.current.lock() = Some((inbound, disposed.clone()));
        Ok(Arc::new(ConsolePanel {
            title: spec.title,
            dump: self.dump.clone(),
            receiver: Mutex::new(Some(receiver)),
            disposed,
        }))
    }

    fn workspace_roots(&self) -> Vec<PathBuf> {
        std::env::current_dir().into_iter().collect()
    }

    fn has_active_view(&self) -> bool {
        false
    }

    fn notify(&self, notice: Notice) {
        warn!("{notice}");
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn load(path: Option<&Path>) -> Result<TrellisConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new().file(path),
        None => ConfigLoader::new().with_current_dir(),
    };
    loader.load().context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load(args.config.as_deref())?;
    config.webview.dev_mode |= args.dev;
    logging::init_from_config(&config.logging);

    let engine = Arc::new(LocalEngine::from_config(&config.engine));
    let host = Arc::new(ConsoleHost {
        dump: args.dump.clone(),
        ..Default::default()
    });

    let mut profile = Profile::new("counter")
        .with_display_name("Counter")
        .with_url(&args.url);
    if let Some(method) = &args.call {
        profile = profile.with_methods([method.as_str()]);
    }
    let builder = config.webview.connector_builder(
        profile,
        host.clone(),
        Some(HostContext::new(&args.extension)),
    );
    engine.register(WebviewPlugin::from_builder(&engine, builder))?;

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(event = %event.event, payload = %event.payload, "Engine event");
        }
    });

    engine
        .call(MANAGER, "activatePlugin", vec!["counter".into()])
        .await
        .context("failed to activate plugin")?;

    if let Some(method) = args.call.clone() {
        let engine = engine.clone();
        tokio::spawn(async move {
            match engine.call("counter", &method, vec![1.into()]).await {
                Ok(value) => info!(method = %method, result = %value, "Call returned"),
                Err(e) => error!(method = %method, error = %e, "Call failed"),
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(message) => host.deliver(message),
            Err(e) => warn!(error = %e, "Input is not JSON"),
        }
    }

    host.close();
    // The panel-closed listener deactivates the plugin.
    let deactivated = tokio::time::timeout(Duration::from_secs(2), async {
        while engine.is_active("counter") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if deactivated.is_err() {
        warn!("Plugin still active after closing the panel");
    }
    info!("Bye");
    Ok(())
}
