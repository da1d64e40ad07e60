//! Page content extraction and link discovery
//!
//! Workers hand every fetched body to a [`ContentExtractor`], which produces
//! the record to persist and the outbound links to enqueue. Both operations
//! are bounded by the configured token budget.

mod links;
mod text;

pub use links::{discover_links, resolve_link};
pub use text::{extract_content, ExtractedContent};

use url::Url;

/// Turns raw page bytes into content and outbound links
pub trait ContentExtractor: Send + Sync {
    /// Extracts the title, cleaned text and word count of a page
    fn extract(&self, body: &[u8], token_budget: usize) -> ExtractedContent;

    /// Finds absolute http(s) links in a page fetched from `base_url`
    fn discover_links(&self, base_url: &str, body: &[u8], token_budget: usize) -> Vec<String>;
}

/// HTML extractor backed by `scraper`
///
/// Bodies are decoded as UTF-8 with invalid sequences replaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for HtmlExtractor {
    fn extract(&self, body: &[u8], token_budget: usize) -> ExtractedContent {
        extract_content(&String::from_utf8_lossy(body), token_budget)
    }

    fn discover_links(&self, base_url: &str, body: &[u8], token_budget: usize) -> Vec<String> {
        let Ok(base) = Url::parse(base_url) else {
            tracing::debug!("Cannot resolve links against {}", base_url);
            return Vec::new();
        };
        discover_links(&base, &String::from_utf8_lossy(body), token_budget)
    }
}
