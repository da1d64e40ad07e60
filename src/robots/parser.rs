//! Robots.txt rule evaluation
//!
//! This module wraps the robotstxt crate's matcher behind a small owned type
//! that can be cached per host.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// An empty body permits every URL.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
}

impl ParsedRobots {
    /// Creates a ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The product token, e.g. `PoliteCrawler`
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}
