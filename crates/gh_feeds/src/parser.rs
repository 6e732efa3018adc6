use chrono::{DateTime, Utc};
use gh_core::text::content_hash;
use gh_core::{Error, RawArticle, Result};
use rss::{Channel, Item};
use url::Url;

use crate::sanitize::{first_image, html_to_text, sanitize};
use crate::sources::FeedSource;

/// Articles recovered from one feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub articles: Vec<RawArticle>,
    /// Items in the document, valid or not.
    pub total_items: usize,
}

/// Parses an RSS document fetched from `source`.
///
/// Items missing a title, a description or a parseable link are dropped.
/// Items without a usable date are stamped with `fetched_at`.
pub fn parse_feed(bytes: &[u8], source: &FeedSource, fetched_at: DateTime<Utc>) -> Result<ParsedFeed> {
    let channel = Channel::read_from(bytes)
        .map_err(|e| Error::Feed(format!("{}: unreadable feed: {}", source.name, e)))?;

    let articles = channel
        .items()
        .iter()
        .filter_map(|item| parse_item(item, source, fetched_at))
        .collect();

    Ok(ParsedFeed {
        articles,
        total_items: channel.items().len(),
    })
}

fn parse_item(item: &Item, source: &FeedSource, fetched_at: DateTime<Utc>) -> Option<RawArticle> {
    let title = sanitize(item.title().unwrap_or_default());
    let link = sanitize(item.link().unwrap_or_default());
    let content = sanitize(item.content().unwrap_or_default());
    let summary = sanitize(item.description().unwrap_or_default());

    let body = if content.is_empty() { &summary } else { &content };
    let description = html_to_text(body);

    let original_id = content_hash(if link.is_empty() { &title } else { &link });

    if title.is_empty() || description.is_empty() {
        return None;
    }
    let link = Url::parse(&link).ok()?;

    let pub_date = item
        .pub_date()
        .and_then(parse_pub_date)
        .unwrap_or(fetched_at);

    let image_url = enclosure_image(item)
        .or_else(|| media_image(item, "content"))
        .or_else(|| media_image(item, "thumbnail"))
        .or_else(|| first_image(&content))
        .or_else(|| first_image(&summary));

    Some(RawArticle {
        title,
        description,
        link,
        pub_date,
        source: source.name.clone(),
        category: source.category,
        image_url,
        original_id,
    })
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn enclosure_image(item: &Item) -> Option<String> {
    let enclosure = item.enclosure()?;
    let mime = enclosure.mime_type();
    if !mime.is_empty() && !mime.starts_with("image/") {
        return None;
    }
    non_empty(sanitize(enclosure.url()))
}

fn media_image(item: &Item, element: &str) -> Option<String> {
    item.extensions()
        .get("media")?
        .get(element)?
        .iter()
        .filter_map(|ext| ext.attrs().get("url"))
        .find_map(|url| non_empty(sanitize(url)))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
