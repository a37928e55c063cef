//! URL resolution.
//!
//! Classifies a content source as local or remote and turns local sources into
//! absolute base directories.
//!
//! | Input | `relative_to` | Base |
//! |---|---|---|
//! | `http(s)://…` | any | the URL (its directory if it names an `.html` file) |
//! | absolute path / `file://` | any | the path |
//! | relative path | `extension` | `<extension_path>/<path>` |
//! | relative path | `workspace` | `<first workspace root>/<path>` |

use std::path::{Component, Path, PathBuf};

use trellis_core::{ConfigurationError, ConnectorOptions, Host, Profile, RelativeTo};
use url::Url;

/// Where a connector's content lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// Content on the local filesystem.
    Local {
        /// Absolute base directory; `index.html` and assets are resolved against it.
        base: PathBuf,
        /// True when the source named an `.html` file rather than a directory.
        html_file: bool,
    },
    /// Content served over HTTP(S).
    Remote {
        /// The URL as given.
        url: String,
        /// Base URL assets are resolved against.
        base: String,
        /// True when the source named an `.html` file rather than a directory.
        html_file: bool,
    },
}

impl ResolvedSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// True when the source named an `.html` file.
    pub fn points_at_html_file(&self) -> bool {
        match self {
            Self::Local { html_file, .. } | Self::Remote { html_file, .. } => *html_file,
        }
    }
}

/// Returns true for `http:` and `https:` URLs.
pub fn is_remote_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Resolves `url` for `profile`.
pub fn resolve(
    url: &str,
    options: &ConnectorOptions,
    profile: &Profile,
    host: &dyn Host,
) -> Result<ResolvedSource, ConfigurationError> {
    if is_remote_url(url) {
        return Ok(resolve_remote(url));
    }

    let path = local_path(url);
    let full_path = if path.is_absolute() {
        path
    } else {
        let root = match options.relative_to {
            RelativeTo::Extension => options
                .context
                .as_ref()
                .map(|ctx| ctx.extension_path.clone())
                .ok_or_else(|| ConfigurationError::MissingContext {
                    plugin: profile.name.clone(),
                    path: url.to_string(),
                })?,
            RelativeTo::Workspace => host.workspace_roots().into_iter().next().ok_or_else(|| {
                ConfigurationError::NoWorkspace {
                    path: url.to_string(),
                }
            })?,
        };
        root.join(path)
    };

    let full_path = normalize(&full_path);
    let html_file = has_html_extension(&full_path);
    let base = if html_file {
        full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| full_path.clone())
    } else {
        full_path
    };

    Ok(ResolvedSource::Local { base, html_file })
}

fn resolve_remote(url: &str) -> ResolvedSource {
    let Ok(mut parsed) = Url::parse(url) else {
        return ResolvedSource::Remote {
            url: url.to_string(),
            base: url.to_string(),
            html_file: false,
        };
    };

    let html_file = parsed.path().ends_with(".html");
    if html_file && let Ok(mut segments) = parsed.path_segments_mut() {
        segments.pop();
    }
    parsed.set_query(None);
    parsed.set_fragment(None);
    let base = parsed.as_str().trim_end_matches('/').to_string();

    ResolvedSource::Remote {
        url: url.to_string(),
        base,
        html_file,
    }
}

/// Path component of a local source; `file://` URLs are decoded, query and
/// fragment are dropped.
fn local_path(url: &str) -> PathBuf {
    if url.starts_with("file:")
        && let Ok(path) = Url::parse(url).map_err(|_| ()).and_then(|u| u.to_file_path())
    {
        return path;
    }
    let end = url.find(['?', '#']).unwrap_or(url.len());
    PathBuf::from(&url[..end])
}

fn has_html_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "html")
}

/// Lexically normalizes a path: drops `.`, folds `..` into its parent.
///
/// `..` never climbs above the root of an absolute path.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use trellis_core::HostContext;

    fn extension_options(path: &str) -> ConnectorOptions {
        ConnectorOptions::default().with_context(HostContext::new(path))
    }

    #[test]
    fn test_remote_classification() {
        assert!(is_remote_url("https://example.com/plugin"));
        assert!(is_remote_url("http://localhost:8080"));
        assert!(!is_remote_url("widget/index.html"));
        assert!(!is_remote_url("/abs/widget"));
        assert!(!is_remote_url("file:///abs/widget"));
        assert!(!is_remote_url("ipfs://Qm123"));
    }

    #[cfg(unix)]
    #[test]
    fn test_extension_relative_html_file() {
        let host = RecordingHost::new();
        let source = resolve(
            "widget/index.html",
            &extension_options("/ext"),
            &Profile::new("widget"),
            &host,
        )
        .unwrap();
        assert_eq!(
            source,
            ResolvedSource::Local {
                base: PathBuf::from("/ext/widget"),
                html_file: true,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_extension_relative_directory() {
        let host = RecordingHost::new();
        let source = resolve(
            "./widget/dist",
            &extension_options("/ext"),
            &Profile::new("widget"),
            &host,
        )
        .unwrap();
        assert_eq!(
            source,
            ResolvedSource::Local {
                base: PathBuf::from("/ext/widget/dist"),
                html_file: false,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_path_is_extension_root() {
        let host = RecordingHost::new();
        let source = resolve("", &extension_options("/ext"), &Profile::new("w"), &host).unwrap();
        assert_eq!(
            source,
            ResolvedSource::Local {
                base: PathBuf::from("/ext"),
                html_file: false,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_path_used_verbatim() {
        let host = RecordingHost::new();
        let options = ConnectorOptions::default().with_relative_to(RelativeTo::Workspace);
        let source = resolve("/srv/widget/page.html", &options, &Profile::new("w"), &host).unwrap();
        assert_eq!(
            source,
            ResolvedSource::Local {
                base: PathBuf::from("/srv/widget"),
                html_file: true,
            }
        );

        let source = resolve("file:///srv/my%20widget", &options, &Profile::new("w"), &host)
            .unwrap();
        assert_eq!(
            source,
            ResolvedSource::Local {
                base: PathBuf::from("/srv/my widget"),
                html_file: false,
            }
        );
    }

    #[test]
    fn test_workspace_without_workspace_fails() {
        let host = RecordingHost::new();
        let options = extension_options("/ext").with_relative_to(RelativeTo::Workspace);
        let err = resolve("widget", &options, &Profile::new("w"), &host).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::NoWorkspace {
                path: "widget".into()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_workspace_uses_first_root() {
        let host = RecordingHost::new().with_workspace_roots(vec![
            PathBuf::from("/work/a"),
            PathBuf::from("/work/b"),
        ]);
        let options = ConnectorOptions::default().with_relative_to(RelativeTo::Workspace);
        let source = resolve("plugins/w/index.html", &options, &Profile::new("w"), &host).unwrap();
        assert_eq!(
            source,
            ResolvedSource::Local {
                base: PathBuf::from("/work/a/plugins/w"),
                html_file: true,
            }
        );
    }

    #[test]
    fn test_extension_without_context_fails() {
        let host = RecordingHost::new();
        let err = resolve(
            "widget",
            &ConnectorOptions::default(),
            &Profile::new("w"),
            &host,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingContext { plugin, .. } if plugin == "w"));
    }

    #[test]
    fn test_remote_base() {
        let host = RecordingHost::new();
        let options = ConnectorOptions::default();
        let profile = Profile::new("w");

        let source = resolve("https://example.com/plugin", &options, &profile, &host).unwrap();
        assert_eq!(
            source,
            ResolvedSource::Remote {
                url: "https://example.com/plugin".into(),
                base: "https://example.com/plugin".into(),
                html_file: false,
            }
        );

        let source = resolve(
            "https://example.com/plugin/page.html?v=2",
            &options,
            &profile,
            &host,
        )
        .unwrap();
        assert_eq!(
            source,
            ResolvedSource::Remote {
                url: "https://example.com/plugin/page.html?v=2".into(),
                base: "https://example.com/plugin".into(),
                html_file: true,
            }
        );
        assert!(source.is_remote());
        assert!(source.points_at_html_file());
    }

    #[test]
    fn test_remote_directory_base_drops_query() {
        let host = RecordingHost::new();
        let source = resolve(
            "https://x.com/p?v=1#top",
            &ConnectorOptions::default(),
            &Profile::new("w"),
            &host,
        )
        .unwrap();
        let ResolvedSource::Remote { base, html_file, .. } = &source else {
            panic!("expected a remote source, got {source:?}");
        };
        assert!(!html_file);
        assert_eq!(base, "https://x.com/p");
        assert_eq!(
            crate::loader::index_url(base),
            "https://x.com/p/index.html"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/../../b")), PathBuf::from("../../b"));
    }
}
