//! Dev-mode live reload.
//!
//! Watches a local `index.html` and re-renders the panel whenever it changes.
//! The watcher is owned by a [`ListenerHandle`], so it stops with the rest of
//! the connector's listeners.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trellis_core::{BoxedHost, BoxedPanel, ListenerHandle};

use crate::loader::{INDEX_FILE, read_local_index, render_local};

/// Starts watching `<base>/index.html`.
///
/// The parent directory is watched and events are filtered to the index file,
/// so editors that save by renaming keep triggering reloads. Bursts of events
/// collapse into one reload of the latest content.
pub fn watch_index(
    base: PathBuf,
    panel: BoxedPanel,
    host: BoxedHost,
    token: CancellationToken,
) -> notify::Result<ListenerHandle> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_index_change(&event) => {
            let _ = tx.send(());
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "File watch error"),
    })?;
    watcher.watch(&base, RecursiveMode::NonRecursive)?;
    info!(path = %base.join(INDEX_FILE).display(), "Watching for changes");

    let task = tokio::spawn(reload_loop(base, panel, host, rx, token.clone()));
    Ok(ListenerHandle::new("dev-reload", token)
        .with_task(task)
        .with_guard::<RecommendedWatcher>(watcher))
}

fn is_index_change(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|name| name == INDEX_FILE))
}

async fn reload_loop(
    base: PathBuf,
    panel: BoxedPanel,
    host: BoxedHost,
    mut rx: mpsc::UnboundedReceiver<()>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            changed = rx.recv() => {
                if changed.is_none() {
                    break;
                }
                while rx.try_recv().is_ok() {}
                reload(&base, &panel, &host, &token).await;
            }
        }
    }
    debug!(base = %base.display(), "Reload loop stopped");
}

async fn reload(base: &Path, panel: &BoxedPanel, host: &BoxedHost, token: &CancellationToken) {
    let raw = match read_local_index(base).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Reload skipped");
            return;
        }
    };
    if token.is_cancelled() || panel.is_disposed() {
        return;
    }
    let html = render_local(&raw, base, Arc::as_ref(host));
    panel.set_html(html);
    debug!(base = %base.display(), "Panel reloaded");
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind};

    #[test]
    fn test_index_change_filter() {
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/w/index.html"));
        assert!(is_index_change(&event));

        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/w/app.js"));
        assert!(!is_index_change(&event));

        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/w/index.html"));
        assert!(!is_index_change(&event));
    }
}
