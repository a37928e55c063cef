//! Compatibility bridge injection.
//!
//! Embedded content written for a plain browser iframe expects
//! `window.parent.postMessage`; inside a host webview only the host API exists
//! and it may be acquired once. The bridge script memoizes the acquisition and
//! synthesizes `parent` when missing. It is injected exactly once per document.

use std::sync::LazyLock;

use regex::Regex;

/// Marker carried by the bridge script; its presence means "already injected".
pub const BRIDGE_MARKER: &str = "trellis-bridge v1";

/// The bridge script body.
pub const BRIDGE_SCRIPT: &str = include_str!("../assets/bridge.js");

/// Field the wrapper relay sets on messages it forwards into the frame.
pub const ECHO_MARKER: &str = "from_trellis_webview";

const WRAPPER_TEMPLATE: &str = include_str!("../assets/wrapper.html");

static HEAD_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("head pattern is valid"));

static HTML_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html(?:\s[^>]*)?>").expect("html pattern is valid"));

/// Returns true if `html` already carries the bridge.
pub fn is_injected(html: &str) -> bool {
    html.contains(BRIDGE_MARKER)
}

/// Injects the bridge script.
///
/// The script goes right after the opening `<head>` tag. Without one, a
/// `<head>` holding the script is inserted after `<html>`, or at the very start
/// of the document. Injecting twice is a no-op.
pub fn inject(html: &str) -> String {
    if is_injected(html) {
        return html.to_string();
    }

    let script = format!("<script>{BRIDGE_SCRIPT}</script>");
    if let Some(m) = HEAD_OPEN.find(html) {
        return splice(html, m.end(), &script);
    }

    let head = format!("<head>{script}</head>");
    match HTML_OPEN.find(html) {
        Some(m) => splice(html, m.end(), &head),
        None => splice(html, 0, &head),
    }
}

/// Renders the wrapper document embedding `src` in a sandboxed iframe.
///
/// The outer document carries the bridge and a relay forwarding messages in
/// both directions.
pub fn wrapper_document(src: &str) -> String {
    inject(&WRAPPER_TEMPLATE.replace("{{SRC}}", &escape_attribute(src)))
}

fn splice(html: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(html.len() + insert.len());
    out.push_str(&html[..at]);
    out.push_str(insert);
    out.push_str(&html[at..]);
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script_count(html: &str) -> usize {
        html.matches(BRIDGE_MARKER).count()
    }

    #[test]
    fn test_inject_after_head() {
        let html = r#"<html><HEAD lang="en"><title>x</title></HEAD><body></body></html>"#;
        let out = inject(html);
        let head_end = out.find(r#"<HEAD lang="en">"#).unwrap() + r#"<HEAD lang="en">"#.len();
        assert!(out[head_end..].starts_with("<script>"));
        assert!(out.ends_with("<title>x</title></HEAD><body></body></html>"));
        assert_eq!(script_count(&out), 1);
    }

    #[test]
    fn test_header_tag_is_not_head() {
        let html = "<html><body><header>top</header></body></html>";
        let out = inject(html);
        assert!(out.starts_with("<html><head><script>"));
        assert!(out.contains("<header>top</header>"));
    }

    #[test]
    fn test_inject_without_head() {
        let out = inject("<html lang=\"en\"><body>hi</body></html>");
        assert!(out.starts_with("<html lang=\"en\"><head><script>"));
        assert!(out.ends_with("</script></head><body>hi</body></html>"));

        let out = inject("<p>fragment</p>");
        assert!(out.starts_with("<head><script>"));
        assert!(out.ends_with("</script></head><p>fragment</p>"));
    }

    #[test]
    fn test_inject_is_idempotent() {
        let once = inject("<head></head>");
        let twice = inject(&once);
        assert_eq!(once, twice);
        assert_eq!(script_count(&twice), 1);
    }

    #[test]
    fn test_bridge_memoizes_host_api() {
        assert!(BRIDGE_SCRIPT.contains(BRIDGE_MARKER));
        assert!(BRIDGE_SCRIPT.contains("acquireVsCodeApi"));
        assert!(BRIDGE_SCRIPT.contains("'parent'"));
    }

    #[test]
    fn test_wrapper_document() {
        let out = wrapper_document("https://example.com/plugin?a=1&b=\"2\"");
        assert!(out.contains(r#"sandbox="allow-scripts allow-same-origin""#));
        assert!(out.contains(r#"src="https://example.com/plugin?a=1&amp;b=&quot;2&quot;""#));
        assert!(out.contains(ECHO_MARKER));
        assert!(!out.contains("{{SRC}}"));
        assert_eq!(script_count(&out), 1);
    }
}
