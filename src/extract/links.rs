//! Outbound link discovery
//!
//! Links are taken from `<a href>` elements (excluding downloads) and the
//! canonical `<link>`, resolved against the page URL and stripped of
//! fragments. Only http(s) targets survive.

use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

/// Schemes that are never followed, even if a base URL could resolve them
const REJECTED_SCHEMES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

/// Discovers outbound links in an HTML body
///
/// At most `node_budget` DOM nodes are examined, so very large pages only
/// contribute links from their leading portion. Duplicate targets within one
/// page are reported once, in document order.
///
/// # Arguments
///
/// * `base_url` - URL the body was fetched from
/// * `html` - The HTML content
/// * `node_budget` - Maximum number of DOM nodes to walk
pub fn discover_links(base_url: &Url, html: &str, node_budget: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for node in document.root_element().descendants().take(node_budget) {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        let Some(href) = link_target(element) else {
            continue;
        };

        if let Some(absolute) = resolve_link(base_url, href) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    }

    links
}

/// Returns the href of a followable link element
fn link_target(element: ElementRef<'_>) -> Option<&str> {
    let value = element.value();
    match value.name() {
        "a" if value.attr("download").is_none() => value.attr("href"),
        "link"
            if value
                .attr("rel")
                .is_some_and(|rel| rel.eq_ignore_ascii_case("canonical")) =>
        {
            value.attr("href")
        }
        _ => None,
    }
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - hrefs that do not resolve against `base`
/// - non-HTTP(S) URLs after resolution
///
/// The fragment is removed; an empty path resolves to `/`.
///
/// # Examples
///
/// ```
/// use polite_crawler::extract::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://a.com/x").unwrap();
/// assert_eq!(resolve_link(&base, "/y#frag").as_deref(), Some("https://a.com/y"));
/// assert_eq!(resolve_link(&base, "javascript:void(0)"), None);
/// assert_eq!(resolve_link(&base, ""), None);
/// ```
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if REJECTED_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return None;
    }

    let mut absolute = base.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    if absolute.host_str().is_none() {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute.to_string())
}
