//! URL handling for the crawl engine
//!
//! URL identity is the exact serialized string with the fragment stripped; no
//! further canonicalization is applied. This module also derives the per-host
//! keys and robots.txt locations the politeness layer works with.

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses and validates a frontier candidate
///
/// Accepts only absolute `http`/`https` URLs with a host. The fragment is
/// removed so that `page#a` and `page#b` share an identity.
///
/// # Examples
///
/// ```
/// use polite_crawler::url::parse_crawl_url;
///
/// let url = parse_crawl_url("https://example.com/docs#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs");
/// assert!(parse_crawl_url("mailto:someone@example.com").is_err());
/// ```
pub fn parse_crawl_url(raw: &str) -> UrlResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Returns the key identifying the host a URL belongs to
///
/// An explicit port is part of the key, so `localhost:8080` and
/// `localhost:9090` are paced independently.
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Returns the robots.txt location for the host of `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    let host = host_key(url)?;
    Url::parse(&format!("{}://{}/robots.txt", url.scheme(), host)).ok()
}
