use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Category, Comment, Enrichment, NewComment, StoredStory, StoryGroup};
use crate::Result;

pub const MAX_PAGE_SIZE: usize = 50;
pub const MAX_COMMENTS_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Recent,
    Popular,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryQuery {
    pub category: Option<Category>,
    #[serde(default)]
    pub sort: SortOrder,
    pub limit: usize,
    pub cursor: Option<String>,
}

impl Default for StoryQuery {
    fn default() -> Self {
        Self {
            category: None,
            sort: SortOrder::Recent,
            limit: 20,
            cursor: None,
        }
    }
}

impl StoryQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPage {
    pub stories: Vec<StoredStory>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl SaveReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes: u64,
}

#[async_trait]
pub trait StoryStorage: Send + Sync {
    /// Upserts stories keyed by their content hash
    async fn save_stories(&self, stories: &[StoryGroup]) -> Result<SaveReport>;

    async fn get_story(&self, id: &str) -> Result<Option<StoredStory>>;

    /// Lists published stories, newest first
    async fn list_stories(&self, query: &StoryQuery) -> Result<StoryPage>;

    /// Stories still waiting for enrichment
    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<StoredStory>>;

    async fn update_enrichment(&self, id: &str, enrichment: &Enrichment) -> Result<()>;

    async fn increment_views(&self, id: &str) -> Result<()>;

    async fn increment_shares(&self, id: &str) -> Result<()>;

    async fn toggle_like(&self, id: &str, user_id: &str) -> Result<LikeStatus>;

    async fn add_comment(&self, id: &str, comment: NewComment) -> Result<Comment>;

    /// Newest comments first, reported ones excluded
    async fn get_comments(&self, id: &str, limit: usize) -> Result<Vec<Comment>>;

    async fn report_comment(&self, comment_id: &str) -> Result<()>;

    /// Removes stories published before `cutoff`, returning how many were dropped
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
