//! Title and readable text extraction

use scraper::{ElementRef, Html, Selector};

/// Elements whose text counts as page content
const CONTENT_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li";

/// Content elements nested in these containers are page chrome, not content
const SKIPPED_CONTAINERS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];

/// Title and cleaned text of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Trimmed `<title>` text, empty when absent
    pub title: String,
    /// Content words joined by single spaces
    pub text: String,
    /// Number of words in `text`
    pub word_count: usize,
}

/// Extracts the title and content words from an HTML document
///
/// Words are maximal runs of Unicode letters and digits; at most
/// `word_budget` of them are kept. Malformed markup yields whatever the
/// parser recovers, possibly nothing.
pub fn extract_content(html: &str, word_budget: usize) -> ExtractedContent {
    let document = Html::parse_document(html);

    let title = extract_title(&document).unwrap_or_default();
    let words = content_words(&document, word_budget);

    ExtractedContent {
        title,
        word_count: words.len(),
        text: words.join(" "),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn content_words(document: &Html, word_budget: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse(CONTENT_SELECTOR) else {
        return Vec::new();
    };

    let mut words = Vec::new();
    for element in document.select(&selector) {
        if words.len() >= word_budget {
            break;
        }
        if !is_content(element) {
            continue;
        }

        for text in element.text() {
            let remaining = word_budget - words.len();
            words.extend(split_words(text).take(remaining).map(str::to_string));
            if words.len() >= word_budget {
                break;
            }
        }
    }

    words
}

/// True when no ancestor is page chrome or another content element
///
/// A content element inside another one (an `li` holding a `p`) is already
/// covered by the outer element's text.
fn is_content(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .all(|ancestor| {
            let name = ancestor.value().name();
            !SKIPPED_CONTAINERS.contains(&name) && !is_content_tag(name)
        })
}

fn is_content_tag(name: &str) -> bool {
    matches!(name, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li")
}

fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}
