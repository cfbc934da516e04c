//! URL normalization and validation.
//!
//! Every URL comparison in the system goes through [`normalize_url`] so that
//! inventory diffs, fingerprint lookups, and homepage checks all agree on
//! what "the same page" means.

use url::Url;

/// Normalize a URL for storage and comparison.
///
/// Rules:
/// - scheme and host lowercased (schemes and hosts are case-insensitive)
/// - fragment removed (`#section` never names a different resource)
/// - trailing slash stripped, except on the root path
///
/// Query strings are preserved: `?page=2` can be a distinct resource.
/// Unparseable input is returned trimmed and lowercased so callers always
/// get a comparable key.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    // Only http(s) URLs with a host get the structured treatment; anything
    // else is flattened lexically so callers still get a stable key.
    let fallback = || trimmed.trim_end_matches('/').to_lowercase();

    let Ok(parsed) = Url::parse(trimmed) else {
        return fallback();
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return fallback();
    }
    let Some(host) = parsed.host_str() else {
        return fallback();
    };

    let host = host.to_lowercase();
    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = if parsed.path() == "/" {
        String::new()
    } else {
        parsed.path().trim_end_matches('/').to_lowercase()
    };
    let query = parsed
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();

    format!("{}://{}{}{}{}", parsed.scheme(), host, port, path, query)
}

/// Check if a URL is a valid crawl target.
///
/// Skips data URLs, javascript URLs, and other non-http schemes.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Check whether `url` names the homepage of `base_url`.
///
/// Scheme and `www.` differences are ignored: the homepage of
/// `https://www.example.com` is also `http://example.com/`.
#[must_use]
pub fn is_homepage_url(url: &str, base_url: &str) -> bool {
    fn host_and_path(raw: &str) -> Option<String> {
        let parsed = Url::parse(raw.trim()).ok()?;
        let host = parsed
            .host_str()?
            .to_lowercase()
            .trim_start_matches("www.")
            .to_string();
        let path = parsed.path().trim_end_matches('/').to_lowercase();
        Some(format!("{host}{path}"))
    }

    match (host_and_path(url), host_and_path(base_url)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
