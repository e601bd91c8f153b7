//! URL extraction and normalization
//!
//! Links found in item nodes and paginators are frequently relative. This module
//! reads them from the configured attribute and resolves them against the page
//! they were found on.

use scraper::ElementRef;
use url::Url;

use crate::models::{ElementLocation, DEFAULT_URL_ATTRIBUTE};
use crate::parser::selectors::select_all;
use crate::utils::error::ExtractError;

/// Attribute a URL location reads, `href` unless configured otherwise
///
/// Evaluated at read time so the stored location is never modified.
pub fn effective_attribute(location: &ElementLocation) -> &str {
    location.attribute().unwrap_or(DEFAULT_URL_ATTRIBUTE)
}

/// Read the URL identified by `location` below `scope` and resolve it against `page_url`
///
/// With an empty selector the attribute is read from `scope` itself. Returns an
/// empty string when no node or attribute is found.
///
/// # Errors
///
/// Returns `ExtractError::InvalidSelector` if the selector does not compile.
pub fn extract_url(
    location: &ElementLocation,
    scope: ElementRef<'_>,
    page_url: &str,
) -> Result<String, ExtractError> {
    let attr = effective_attribute(location);

    let raw = if location.selector.trim().is_empty() {
        scope.value().attr(attr).map(str::to_string)
    } else {
        select_all(scope, &location.selector)?
            .get(location.node_index)
            .and_then(|node| node.value().attr(attr))
            .map(str::to_string)
    };

    Ok(raw.map(|r| resolve_url(&r, page_url)).unwrap_or_default())
}

/// Resolve a possibly relative URL against the page it was found on
///
/// - absolute URLs (scheme and host) are returned unchanged
/// - `//host/path` takes the page's scheme
/// - `?query` is appended to the page's path
/// - anything else is joined to the page's scheme and host with a single slash
///
/// An empty input yields an empty string.
///
/// # Examples
///
/// ```
/// use gleaner::crawler::url::resolve_url;
///
/// let base = "https://x.test/a/b";
/// assert_eq!(resolve_url("/events/1", base), "https://x.test/events/1");
/// assert_eq!(resolve_url("?p=2", base), "https://x.test/a/b?p=2");
/// assert_eq!(resolve_url("https://y.test/z", base), "https://y.test/z");
/// ```
pub fn resolve_url(raw: &str, page_url: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    if is_absolute(raw) {
        return raw.to_string();
    }

    let Ok(base) = Url::parse(page_url) else {
        tracing::debug!(page_url, raw, "Cannot parse page URL, keeping relative URL");
        return raw.to_string();
    };

    if raw.starts_with("//") {
        return format!("{}:{raw}", base.scheme());
    }

    let origin = format!("{}://{}", base.scheme(), authority(&base));

    if raw.starts_with('?') {
        format!("{origin}{}{raw}", base.path())
    } else if raw.starts_with('/') {
        format!("{origin}{raw}")
    } else {
        format!("{origin}/{raw}")
    }
}

fn is_absolute(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|u| u.has_host())
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
