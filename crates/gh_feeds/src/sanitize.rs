//! Cleanup of untrusted feed markup.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap();
    static ref JAVASCRIPT_SCHEME: Regex = Regex::new(r"(?i)javascript:").unwrap();
    static ref EVENT_HANDLER: Regex = Regex::new(r"(?i)on\w+\s*=").unwrap();
    static ref HTML_DATA_URI: Regex = Regex::new(r"(?i)data:\s*text/html").unwrap();
}

/// Removes script blocks, `javascript:` schemes, inline event handlers and
/// HTML data URIs, then trims.
pub fn sanitize(raw: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(raw, "");
    let text = JAVASCRIPT_SCHEME.replace_all(&text, "");
    let text = EVENT_HANDLER.replace_all(&text, "");
    let text = HTML_DATA_URI.replace_all(&text, "");
    text.trim().to_string()
}

/// Visible text of an HTML fragment with whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `<img src>` in an HTML fragment, skipping tracking pixels.
pub fn first_image(html: &str) -> Option<String> {
    let selector = Selector::parse("img[src]").ok()?;
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty() && !is_tracking_pixel(src))
        .map(str::to_string)
}

fn is_tracking_pixel(src: &str) -> bool {
    src.contains("1x1") || src.contains("pixel") || src.contains("spacer")
}
