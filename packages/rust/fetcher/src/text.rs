//! Plain-text extraction for feed descriptions, which are often HTML.

use scraper::Html;

/// Strip markup from an HTML fragment and collapse runs of whitespace.
///
/// Plain text passes through unchanged apart from whitespace normalization.
pub fn html_to_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    let raw: String = doc.root_element().text().collect::<Vec<_>>().join(" ");
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
