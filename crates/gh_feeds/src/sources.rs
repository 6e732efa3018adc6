use std::path::Path;

use gh_core::{Category, Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// One RSS feed and the category its items are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, category: Category, priority: Priority) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category,
            priority,
        }
    }
}

pub fn default_sources() -> Vec<FeedSource> {
    use Category::*;
    use Priority::*;

    vec![
        FeedSource::new("BBC World", "https://feeds.bbci.co.uk/news/world/rss.xml", World, High),
        FeedSource::new("The Guardian World", "https://www.theguardian.com/world/rss", World, High),
        FeedSource::new("NY Times US", "https://rss.nytimes.com/services/xml/rss/nyt/US.xml", Politics, High),
        FeedSource::new(
            "Washington Post Politics",
            "https://www.washingtonpost.com/arcio/rss/category/politics/?itid=lk_inline_manual_2",
            Politics,
            High,
        ),
        FeedSource::new("The Nation", "https://www.thenation.com/subject/politics/feed/", Politics, High),
        FeedSource::new("Rolling Stone Politics", "https://www.rollingstone.com/politics/feed/", Politics, High),
        FeedSource::new("TechCrunch", "https://techcrunch.com/feed/", Tech, High),
        FeedSource::new("The Verge", "https://www.theverge.com/rss/index.xml", Tech, High),
        FeedSource::new("CNBC Business", "https://www.cnbc.com/id/100003114/device/rss/rss.html", Business, High),
        FeedSource::new("Bloomberg Markets", "https://feeds.bloomberg.com/markets/news.rss", Business, High),
        FeedSource::new("Science Daily", "https://www.sciencedaily.com/rss/top/science.xml", Science, Medium),
        FeedSource::new("ESPN", "https://www.espn.com/espn/rss/news", Sports, Medium),
    ]
}

/// Reads a JSON array of sources from `path`.
pub fn load_sources(path: &Path) -> Result<Vec<FeedSource>> {
    let raw = std::fs::read_to_string(path)?;
    let sources: Vec<FeedSource> = serde_json::from_str(&raw)?;
    if sources.is_empty() {
        return Err(Error::Validation(format!("no feed sources in {}", path.display())));
    }
    Ok(sources)
}

const FEED_INDICATORS: [&str; 4] = ["rss", "feed", "xml", "atom"];
const FEED_EXTENSIONS: [&str; 3] = [".rss", ".xml", ".atom"];
const FEED_PATHS: [&str; 5] = ["/rss/", "/feed/", "/feeds/", "/news/", "/blog/"];

/// Whether `candidate` looks like an http(s) feed endpoint.
pub fn is_valid_feed_url(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let path = url.path().to_lowercase();
    let host = url.host_str().unwrap_or_default().to_lowercase();

    FEED_INDICATORS
        .iter()
        .any(|needle| path.contains(needle) || host.contains(needle))
        || FEED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        || FEED_PATHS.iter().any(|segment| path.contains(segment))
}
