//! Link rewriting.
//!
//! Every `href="…"` and `src="…"` attribute value is rewritten so the webview
//! can load it: local links become sandbox URIs, relative links in fetched
//! remote documents become absolute URLs. Everything outside the matched
//! attribute values is left byte-for-byte intact; this is text substitution,
//! not HTML parsing.

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;
use trellis_core::Host;
use url::{Position, Url};

use crate::resolver::{is_remote_url, normalize};

static LINK_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(href|src)="([^"]*)""#).expect("link pattern is valid"));

/// Rewrites local links against `base` using the host's sandbox mapping.
pub fn rewrite_local(html: &str, base: &Path, host: &dyn Host) -> String {
    rewrite_links(html, |link| {
        let (path, suffix) = split_suffix(link);
        let target = normalize(&base.join(path.trim_start_matches('/')));
        match host.sandbox_uri(&target) {
            Some(uri) => Cow::Owned(format!("{uri}{suffix}")),
            None => {
                warn!(link = %link, target = %target.display(), "Cannot map link to a sandbox URI");
                Cow::Borrowed(link)
            }
        }
    })
}

/// Rewrites relative links of a fetched remote document against `base`.
pub fn rewrite_remote(html: &str, base: &str) -> String {
    rewrite_links(html, |link| Cow::Owned(join_remote(base, link)))
}

/// Joins a link onto a remote base URL.
///
/// `..` never climbs above the origin. A base that does not parse is joined
/// as plain text; that join collapses `//`, so the scheme separator is
/// repaired afterwards.
pub fn join_remote(base: &str, link: &str) -> String {
    let (path, suffix) = split_suffix(link);
    match Url::parse(base) {
        Ok(url) if url.has_host() => {
            let origin = &url[..Position::BeforePath];
            let joined = posix_normalize(&format!("{}/{path}", url.path()));
            format!("{origin}{joined}{suffix}")
        }
        _ => {
            let joined = posix_normalize(&format!("{base}/{path}"));
            format!("{}{suffix}", fix_scheme_separator(&joined))
        }
    }
}

/// Restores `http(s)://` after a join collapsed it to `http(s):/`.
///
/// Already correct URLs are returned unchanged.
pub fn fix_scheme_separator(url: &str) -> Cow<'_, str> {
    for scheme in ["https:", "http:"] {
        let Some(rest) = url.strip_prefix(scheme) else {
            continue;
        };
        if rest.starts_with("//") {
            break;
        }
        if let Some(rest) = rest.strip_prefix('/') {
            return Cow::Owned(format!("{scheme}//{rest}"));
        }
    }
    Cow::Borrowed(url)
}

fn rewrite_links<F>(html: &str, mut map: F) -> String
where
    F: FnMut(&str) -> Cow<'_, str>,
{
    LINK_ATTR
        .replace_all(html, |caps: &Captures<'_>| {
            let link = &caps[2];
            if is_passthrough(link) {
                return caps[0].to_string();
            }
            format!("{}=\"{}\"", &caps[1], map(link))
        })
        .into_owned()
}

/// Links that already point somewhere the webview can follow.
fn is_passthrough(link: &str) -> bool {
    link.is_empty() || link.starts_with('#') || is_remote_url(link) || has_foreign_scheme(link)
}

/// `data:`, `mailto:`, `javascript:` and the like. Single-letter schemes are
/// drive letters.
fn has_foreign_scheme(link: &str) -> bool {
    Url::parse(link).is_ok_and(|u| u.scheme().len() > 1 && u.scheme() != "file")
}

/// Splits `path?query#fragment` into the path and the rest.
fn split_suffix(link: &str) -> (&str, &str) {
    match link.find(['?', '#']) {
        Some(idx) => link.split_at(idx),
        None => (link, ""),
    }
}

fn posix_normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use std::path::PathBuf;
    use trellis_core::SandboxScheme;

    #[test]
    fn test_fragment_and_remote_links_untouched() {
        let host = RecordingHost::new();
        let html = r##"<a href="#">top</a><a href="#intro">intro</a><script src="https://cdn.example.com/x.js"></script>"##;
        assert_eq!(rewrite_local(html, Path::new("/ext/widget"), &host), html);
    }

    #[test]
    fn test_data_and_mailto_links_untouched() {
        let host = RecordingHost::new();
        let html = r#"<img src="data:image/png;base64,AAAA"><a href="mailto:a@b.c">mail</a>"#;
        assert_eq!(rewrite_local(html, Path::new("/ext/widget"), &host), html);
    }

    #[cfg(unix)]
    #[test]
    fn test_local_links_become_sandbox_uris() {
        let host = RecordingHost::new();
        let html = r#"<link href="style.css"><script src="./js/app.js"></script><img src="/img/logo.png">"#;
        let out = rewrite_local(html, Path::new("/ext/widget"), &host);
        assert_eq!(
            out,
            concat!(
                r#"<link href="trellis-resource://localhost/ext/widget/style.css">"#,
                r#"<script src="trellis-resource://localhost/ext/widget/js/app.js"></script>"#,
                r#"<img src="trellis-resource://localhost/ext/widget/img/logo.png">"#,
            )
        );

        let scheme = SandboxScheme::default();
        let decoded = scheme
            .decode("trellis-resource://localhost/ext/widget/js/app.js")
            .unwrap();
        assert_eq!(decoded, PathBuf::from("/ext/widget/js/app.js"));
    }

    #[cfg(unix)]
    #[test]
    fn test_local_link_keeps_query_and_fragment() {
        let host = RecordingHost::new();
        let html = r#"<script src="app.js?v=3"></script><a href="help.html#usage">help</a>"#;
        let out = rewrite_local(html, Path::new("/ext/widget"), &host);
        assert!(out.contains(r#"src="trellis-resource://localhost/ext/widget/app.js?v=3""#));
        assert!(out.contains(r#"href="trellis-resource://localhost/ext/widget/help.html#usage""#));
    }

    #[cfg(unix)]
    #[test]
    fn test_parent_links_are_normalized() {
        let host = RecordingHost::new();
        let out = rewrite_local(r#"<img src="../shared/a.png">"#, Path::new("/ext/widget"), &host);
        assert_eq!(out, r#"<img src="trellis-resource://localhost/ext/shared/a.png">"#);
    }

    #[cfg(unix)]
    #[test]
    fn test_malformed_html_preserved_outside_matches() {
        let host = RecordingHost::new();
        let html = "<div <<unclosed src='single.js' src=\"a.js\" >>\u{1F600}</span";
        let out = rewrite_local(html, Path::new("/w"), &host);
        assert_eq!(
            out,
            "<div <<unclosed src='single.js' src=\"trellis-resource://localhost/w/a.js\" >>\u{1F600}</span"
        );
    }

    #[test]
    fn test_unmappable_link_left_unchanged() {
        let host = RecordingHost::new().without_sandbox();
        let html = r#"<script src="app.js"></script>"#;
        assert_eq!(rewrite_local(html, Path::new("/ext/widget"), &host), html);
    }

    #[test]
    fn test_remote_rewrite() {
        let html = r##"<link href="styles.css"><script src="js/app.js?v=1"></script><a href="https://other.org/x">x</a><a href="#">top</a>"##;
        let out = rewrite_remote(html, "https://example.com/plugin");
        assert_eq!(
            out,
            concat!(
                r#"<link href="https://example.com/plugin/styles.css">"#,
                r#"<script src="https://example.com/plugin/js/app.js?v=1"></script>"#,
                r##"<a href="https://other.org/x">x</a><a href="#">top</a>"##,
            )
        );
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(
            join_remote("https://example.com/plugin/", "../assets/a.css"),
            "https://example.com/assets/a.css"
        );
        assert_eq!(
            join_remote("http://localhost:8080", "index.html"),
            "http://localhost:8080/index.html"
        );
    }

    #[test]
    fn test_join_remote_stays_on_origin() {
        assert_eq!(
            join_remote("https://example.com/plugin", "../../x.css"),
            "https://example.com/x.css"
        );
        assert_eq!(
            join_remote("https://example.com:8443/a/b", "../../../img/logo.png?v=2"),
            "https://example.com:8443/img/logo.png?v=2"
        );
        assert_eq!(
            rewrite_remote(r#"<link href="../../../x.css">"#, "https://example.com/plugin"),
            r#"<link href="https://example.com/x.css">"#
        );
    }

    #[test]
    fn test_fix_scheme_separator() {
        assert_eq!(
            fix_scheme_separator("https:/example.com/x"),
            "https://example.com/x"
        );
        assert_eq!(
            fix_scheme_separator("http:/localhost/x"),
            "http://localhost/x"
        );
        assert_eq!(
            fix_scheme_separator("https://example.com/x"),
            "https://example.com/x"
        );
        assert!(matches!(
            fix_scheme_separator("https://example.com/x"),
            Cow::Borrowed(_)
        ));
        assert_eq!(fix_scheme_separator("styles.css"), "styles.css");
    }
}
