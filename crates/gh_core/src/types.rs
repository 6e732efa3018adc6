use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::text::content_hash;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Politics,
    World,
    Business,
    Tech,
    Science,
    Health,
    Sports,
    Entertainment,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Politics,
        Category::World,
        Category::Business,
        Category::Tech,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "politics",
            Category::World => "world",
            Category::Business => "business",
            Category::Tech => "tech",
            Category::Science => "science",
            Category::Health => "health",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| Error::InvalidCategory(s.to_string()))
    }
}

/// A normalized feed item, as handed over by the feed reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    pub title: String,
    pub description: String,
    pub link: Url,
    pub pub_date: DateTime<Utc>,
    pub source: String,
    pub category: Category,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub original_id: String,
}

impl RawArticle {
    /// Checks the fields the feed reader is expected to guarantee.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidArticle(format!("empty title ({})", self.link)));
        }
        if self.description.trim().is_empty() {
            return Err(Error::InvalidArticle(format!("empty description ({})", self.link)));
        }
        if self.source.trim().is_empty() {
            return Err(Error::InvalidArticle(format!("empty source ({})", self.link)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub source: String,
    pub url: String,
}

/// One real-world event as reported by one or more sources.
///
/// The parallel sequences (`sources`, `descriptions`, `links`, `categories`,
/// `pub_dates`) always have `source_diversity` entries each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryGroup {
    pub title: String,
    pub description: String,
    pub link: Url,
    pub source: String,
    pub original_id: String,
    pub image_url: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub category: Category,
    pub sources: Vec<String>,
    pub descriptions: Vec<String>,
    pub links: Vec<SourceLink>,
    pub categories: Vec<Category>,
    pub pub_dates: Vec<DateTime<Utc>>,
    pub source_diversity: usize,
    pub unique_categories: Vec<Category>,
    pub combined_description: String,
}

impl StoryGroup {
    /// Storage key derived from the representative title and publish time.
    pub fn content_hash(&self) -> String {
        let stamp = self.pub_date.to_rfc3339_opts(SecondsFormat::Millis, true);
        content_hash(&format!("{}{}", self.title, stamp))
    }

    pub fn is_singleton(&self) -> bool {
        self.source_diversity == 1
    }

    pub fn is_consistent(&self) -> bool {
        let n = self.source_diversity;
        self.sources.len() == n
            && self.descriptions.len() == n
            && self.links.len() == n
            && self.categories.len() == n
            && self.pub_dates.len() == n
    }
}

/// Output of the enrichment collaborator for a single story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub should_publish: bool,
    pub quality_score: u8,
    pub quality_reason: String,
    pub category: Category,
    pub summary: Option<String>,
    pub daily_life_impact: Option<String>,
    pub image_keywords: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub likes: u64,
    pub shares: u64,
    pub views: u64,
    pub comment_count: u64,
    #[serde(default)]
    pub liked_by: Vec<String>,
}

impl Engagement {
    pub fn score(&self) -> f64 {
        self.likes as f64 * 3.0 + self.comment_count as f64 * 2.0 + self.views as f64 * 0.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStory {
    pub id: String,
    #[serde(flatten)]
    pub story: StoryGroup,
    pub enrichment: Option<Enrichment>,
    pub processed: bool,
    pub fetched_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub engagement: Engagement,
}

impl StoredStory {
    pub fn new(story: StoryGroup, fetched_at: DateTime<Utc>) -> Self {
        Self {
            id: story.content_hash(),
            story,
            enrichment: None,
            processed: false,
            fetched_at,
            processed_at: None,
            engagement: Engagement::default(),
        }
    }

    /// Whether the story is visible in public listings.
    pub fn is_listed(&self) -> bool {
        let published = self
            .enrichment
            .as_ref()
            .map(|e| e.summary.is_some())
            .unwrap_or(false);
        self.processed && published && self.story.category != Category::Sports
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub story_id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub reported: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub user_id: String,
    pub username: String,
    pub text: String,
}

pub const MAX_COMMENT_CHARS: usize = 500;

impl NewComment {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() || self.username.trim().is_empty() {
            return Err(Error::Validation("userId and username are required".to_string()));
        }
        let len = self.text.chars().count();
        if len == 0 || len > MAX_COMMENT_CHARS {
            return Err(Error::Validation(format!(
                "Comment must be between 1 and {} characters",
                MAX_COMMENT_CHARS
            )));
        }
        Ok(())
    }
}
