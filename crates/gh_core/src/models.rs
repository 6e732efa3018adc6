use std::fmt;

use async_trait::async_trait;

use crate::types::{Enrichment, RawArticle, StoryGroup};
use crate::Result;

#[async_trait]
pub trait Enricher: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Scores, categorizes and summarizes a merged story
    async fn enrich(&self, story: &StoryGroup) -> Result<Enrichment>;
}

#[async_trait]
pub trait FeedReader: Send + Sync {
    /// Fetches every configured feed and returns the validated items
    async fn fetch_all(&self) -> Result<Vec<RawArticle>>;
}
