//! Content loading.
//!
//! Produces the final HTML document for a resolved source: local documents are
//! read from disk, link-rewritten and bridged; remote documents are either
//! wrapped in a sandboxed iframe or fetched and rewritten, per [`RemotePolicy`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trellis_core::{ConnectError, Host};

use crate::bridge;
use crate::rewriter::{join_remote, rewrite_local, rewrite_remote};

/// Document name looked up in a base directory.
pub const INDEX_FILE: &str = "index.html";

/// Default remote fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// How remote sources are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePolicy {
    /// Embed the remote origin in a sandboxed iframe.
    #[default]
    Wrap,
    /// Download `index.html` and rewrite its links to absolute URLs.
    Fetch,
}

/// Downloads remote documents.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, ConnectError>;
}

/// [`RemoteFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, ConnectError> {
        let failed = |e: reqwest::Error| ConnectError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let request = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "text/html")
                .send()
                .await
                .map_err(failed)?;

            let status = response.status();
            if !status.is_success() {
                return Err(ConnectError::FetchStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            response.text().await.map_err(failed)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .unwrap_or_else(|_| {
                Err(ConnectError::FetchTimeout {
                    url: url.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            })
    }
}

/// Reads `<base>/index.html`.
pub async fn read_local_index(base: &Path) -> Result<String, ConnectError> {
    let path = base.join(INDEX_FILE);
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ConnectError::ReadFailed {
            path,
            reason: e.to_string(),
        })
}

/// Rewrites and bridges a local document.
pub fn render_local(raw: &str, base: &Path, host: &dyn Host) -> String {
    bridge::inject(&rewrite_local(raw, base, host))
}

/// Loads the local document rooted at `base`.
pub async fn load_local(base: &Path, host: &dyn Host) -> Result<String, ConnectError> {
    let raw = read_local_index(base).await?;
    debug!(base = %base.display(), bytes = raw.len(), "Loaded local document");
    Ok(render_local(&raw, base, host))
}

/// URL of a remote base's index document.
pub fn index_url(base: &str) -> String {
    join_remote(base, INDEX_FILE)
}

/// Loads a remote document.
///
/// `url` is the source as given, `base` the directory links are resolved
/// against.
pub async fn load_remote(
    url: &str,
    base: &str,
    policy: RemotePolicy,
    fetcher: &dyn RemoteFetcher,
) -> Result<String, ConnectError> {
    match policy {
        RemotePolicy::Wrap => Ok(bridge::wrapper_document(url)),
        RemotePolicy::Fetch => {
            let index = index_url(base);
            let raw = fetcher.fetch_text(&index).await?;
            debug!(url = %index, bytes = raw.len(), "Fetched remote document");
            Ok(bridge::inject(&rewrite_remote(&raw, base)))
        }
    }
}
