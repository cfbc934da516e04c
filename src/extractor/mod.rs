//! Semantic fingerprint extraction for change detection.
//!
//! Reduces an HTML document to a hash that is insensitive to noise: deploy
//! hashes in script tags, tracker snippets, cookie banners, and whitespace
//! churn all produce the same fingerprint, while a real change to the title,
//! meta description, main content, or navigation produces a different one.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

/// Maximum characters of main-content text included in the fingerprint.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Maximum navigation links included in the fingerprint.
const MAX_NAV_LINKS: usize = 20;

/// Elements removed entirely before text extraction (noisy, dynamic).
const NOISY_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "canvas", "video", "audio", "source", "track",
    "embed", "object",
];

/// Class/id substrings that mark dynamic chrome (ads, consent, overlays).
const NOISY_ATTR_PATTERNS: &[&str] = &[
    "ad-", "ads-", "intercom", "hubspot", "drift", "cookie", "gdpr", "consent", "popup", "modal",
    "overlay",
];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE: hardcoded regex is valid"));

// Hardcoded selectors never fail to parse; a failure here is a compile-time bug.

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("BUG: 'title' selector is invalid"));

static META_DESC_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[name='description']").expect("BUG: meta description selector is invalid")
});

static OG_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:title']").expect("BUG: og:title selector is invalid")
});

static OG_DESC_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:description']")
        .expect("BUG: og:description selector is invalid")
});

static MAIN_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main").expect("BUG: 'main' selector is invalid"));

static ARTICLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("BUG: 'article' selector is invalid"));

static ROLE_MAIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[role='main']").expect("BUG: \"[role='main']\" selector is invalid")
});

static CONTENT_ID_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#content").expect("BUG: '#content' selector is invalid"));

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BUG: 'body' selector is invalid"));

static NAV_ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("nav a[href], header a[href]").expect("BUG: nav anchor selector is invalid")
});

/// Extract the semantic fingerprint of an HTML document (SHA-256 hex).
///
/// Identical semantic content produces an identical hash; script/style
/// churn, tracker elements, and whitespace differences do not change it.
#[must_use]
pub fn extract_fingerprint(html: &str) -> String {
    let content = extract_content(html);
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(digest)
}

/// Extract the normalized semantic content string that gets hashed.
///
/// The parts appear in fixed order so the hash is deterministic:
/// title, meta description, Open Graph title/description, up to
/// [`MAX_CONTENT_CHARS`] of main-content text, and the first 20
/// navigation link hrefs.
#[must_use]
pub fn extract_content(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = document.select(&TITLE_SELECTOR).next() {
        let text = normalize_text(&title.text().collect::<String>());
        if !text.is_empty() {
            parts.push(format!("TITLE:{text}"));
        }
    }

    if let Some(desc) = meta_content(&document, &META_DESC_SELECTOR) {
        parts.push(format!("DESC:{desc}"));
    }
    if let Some(og_title) = meta_content(&document, &OG_TITLE_SELECTOR) {
        parts.push(format!("OG_TITLE:{og_title}"));
    }
    if let Some(og_desc) = meta_content(&document, &OG_DESC_SELECTOR) {
        parts.push(format!("OG_DESC:{og_desc}"));
    }

    let main_text = extract_main_text(&document);
    if !main_text.is_empty() {
        parts.push(format!("CONTENT:{main_text}"));
    }

    let nav_links = extract_nav_links(&document);
    if !nav_links.is_empty() {
        parts.push(format!("NAV:{}", nav_links.join(",")));
    }

    parts.join("\n")
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    let content = document.select(selector).next()?.value().attr("content")?;
    let normalized = normalize_text(content);
    (!normalized.is_empty()).then_some(normalized)
}

/// Find the main content container and collect its visible text, skipping
/// noisy subtrees. Container priority: `<main>`, `<article>`, `[role=main]`,
/// `#content`, then `<body>`.
fn extract_main_text(document: &Html) -> String {
    let container_selectors = [
        &*MAIN_SELECTOR,
        &*ARTICLE_SELECTOR,
        &*ROLE_MAIN_SELECTOR,
        &*CONTENT_ID_SELECTOR,
        &*BODY_SELECTOR,
    ];

    let mut container = None;
    for selector in container_selectors {
        if let Some(element) = document.select(selector).next() {
            container = Some(element);
            break;
        }
    }

    let Some(container) = container else {
        return String::new();
    };

    let mut raw = String::new();
    collect_visible_text(&container, &mut raw);
    truncate_chars(&normalize_text(&raw), MAX_CONTENT_CHARS)
}

/// Recursively collect text, skipping noisy elements and their subtrees.
fn collect_visible_text(element: &ElementRef, output: &mut String) {
    for child in element.children() {
        match child.value() {
            scraper::node::Node::Text(text) => {
                let _ = write!(output, " {}", &**text);
            }
            scraper::node::Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if is_noisy_element(&child_el) {
                        continue;
                    }
                    collect_visible_text(&child_el, output);
                }
            }
            _ => {}
        }
    }
}

fn is_noisy_element(element: &ElementRef) -> bool {
    let value = element.value();

    if NOISY_TAGS.contains(&value.name()) {
        return true;
    }

    if value.attr("data-analytics").is_some() || value.attr("data-tracking").is_some() {
        return true;
    }

    for attr in ["class", "id"] {
        if let Some(v) = value.attr(attr) {
            let v = v.to_lowercase();
            if NOISY_ATTR_PATTERNS.iter().any(|p| v.contains(p)) {
                return true;
            }
        }
    }

    false
}

/// Collect hrefs of anchors inside `<nav>` and `<header>`, deduplicated in
/// order, with fragments and query strings stripped.
fn extract_nav_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    for anchor in document.select(&NAV_ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("javascript:") {
            continue;
        }

        let href = href.split(['?', '#']).next().unwrap_or_default();
        let href = href.trim_end_matches('/');
        if href.is_empty() {
            continue;
        }

        let href = href.to_string();
        if !links.contains(&href) {
            links.push(href);
        }
        if links.len() >= MAX_NAV_LINKS {
            break;
        }
    }

    links
}

/// Lowercase and collapse all whitespace runs to a single space.
fn normalize_text(text: &str) -> String {
    WHITESPACE_RE
        .replace_all(text, " ")
        .trim()
        .to_lowercase()
}

/// Truncate at a char boundary, not a byte offset.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html>
          <head>
            <title>Acme Platform</title>
            <meta name="description" content="Build things faster.">
            <meta property="og:title" content="Acme">
          </head>
          <body>
            <nav>
              <a href="/features">Features</a>
              <a href="/pricing/">Pricing</a>
              <a href="#top">Top</a>
            </nav>
            <main><p>Welcome to Acme. We build things.</p></main>
          </body>
        </html>
    "##;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(extract_fingerprint(PAGE), extract_fingerprint(PAGE));
    }

    #[test]
    fn test_script_churn_does_not_change_fingerprint() {
        let with_script = PAGE.replace(
            "<main>",
            "<script>var deploy='abc123';</script><main>",
        );
        let with_other_script = PAGE.replace(
            "<main>",
            "<script>var deploy='zzz999';</script><main>",
        );
        assert_eq!(
            extract_fingerprint(&with_script),
            extract_fingerprint(&with_other_script)
        );
        assert_eq!(extract_fingerprint(PAGE), extract_fingerprint(&with_script));
    }

    #[test]
    fn test_consent_banner_is_ignored() {
        let with_banner = PAGE.replace(
            "<main>",
            r#"<div class="cookie-consent">We use cookies</div><main>"#,
        );
        assert_eq!(extract_fingerprint(PAGE), extract_fingerprint(&with_banner));
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let reflowed = PAGE.replace("Welcome to Acme. We build things.", "Welcome   to\n Acme.  We build things.");
        assert_eq!(extract_fingerprint(PAGE), extract_fingerprint(&reflowed));
    }

    #[test]
    fn test_content_change_changes_fingerprint() {
        let changed = PAGE.replace("We build things.", "We ship rockets.");
        assert_ne!(extract_fingerprint(PAGE), extract_fingerprint(&changed));
    }

    #[test]
    fn test_title_change_changes_fingerprint() {
        let changed = PAGE.replace("Acme Platform", "Acme 2.0");
        assert_ne!(extract_fingerprint(PAGE), extract_fingerprint(&changed));
    }

    #[test]
    fn test_nav_links_normalized_and_deduped() {
        let content = extract_content(PAGE);
        assert!(content.contains("NAV:/features,/pricing"), "{content}");
        // The anchor-only link is excluded.
        assert!(!content.contains("#top"));
    }

    #[test]
    fn test_parts_appear_in_fixed_order() {
        let content = extract_content(PAGE);
        let title_pos = content.find("TITLE:").expect("has title");
        let desc_pos = content.find("DESC:").expect("has description");
        let content_pos = content.find("CONTENT:").expect("has content");
        let nav_pos = content.find("NAV:").expect("has nav");
        assert!(title_pos < desc_pos && desc_pos < content_pos && content_pos < nav_pos);
    }

    #[test]
    fn test_main_preferred_over_body() {
        let content = extract_content(PAGE);
        // Nav link text lives outside <main> and is not part of CONTENT.
        let content_part = content
            .lines()
            .find(|l| l.starts_with("CONTENT:"))
            .expect("content part");
        assert!(content_part.contains("welcome to acme"));
        assert!(!content_part.contains("pricing"));
    }

    #[test]
    fn test_truncates_long_content() {
        let body = "word ".repeat(5000);
        let html = format!("<html><body><main>{body}</main></body></html>");
        let content = extract_content(&html);
        let content_part = content
            .lines()
            .find(|l| l.starts_with("CONTENT:"))
            .expect("content part");
        assert!(content_part.len() <= "CONTENT:".len() + MAX_CONTENT_CHARS);
    }
}
