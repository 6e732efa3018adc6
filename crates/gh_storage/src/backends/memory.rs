use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gh_core::storage::MAX_COMMENTS_PAGE;
use gh_core::{
    Comment, Enrichment, Error, LikeStatus, NewComment, Result, SaveReport, StoredStory, StoryGroup,
    StoryPage, StoryQuery, StoryStorage,
};
use tokio::sync::RwLock;
use tracing::info;

use super::{comment_id, finish_page, listing_order, save_in_batches};

#[derive(Debug, Default)]
pub struct MemoryStore {
    stories: HashMap<String, StoredStory>,
    comments: Vec<Comment>,
}

impl MemoryStore {
    /// Inserts new stories; known ids only get their group data refreshed.
    fn upsert(&mut self, batch: Vec<StoredStory>) {
        for incoming in batch {
            match self.stories.get_mut(&incoming.id) {
                Some(existing) => {
                    let category = existing.story.category;
                    existing.story = incoming.story;
                    if existing.enrichment.is_some() {
                        existing.story.category = category;
                    }
                }
                None => {
                    self.stories.insert(incoming.id.clone(), incoming);
                }
            }
        }
    }

    fn story_mut(&mut self, id: &str) -> Result<&mut StoredStory> {
        self.stories
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("story {}", id)))
    }

    fn list(&self, query: &StoryQuery) -> StoryPage {
        let after = query
            .cursor
            .as_deref()
            .and_then(|cursor| self.stories.get(cursor));

        let mut listed: Vec<&StoredStory> = self
            .stories
            .values()
            .filter(|s| s.is_listed())
            .filter(|s| query.category.map_or(true, |c| s.story.category == c))
            .filter(|s| after.map_or(true, |cursor| listing_order(cursor, s).is_lt()))
            .collect();
        listed.sort_by(|a, b| listing_order(a, b));

        let page = listed
            .into_iter()
            .take(query.effective_limit() + 1)
            .cloned()
            .collect();
        finish_page(page, query)
    }
}

/// Process-local storage; everything is lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
    next_comment: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.stories.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StoryStorage for MemoryStorage {
    async fn save_stories(&self, stories: &[StoryGroup]) -> Result<SaveReport> {
        let report = save_in_batches(stories, Utc::now(), Duration::ZERO, |batch| async move {
            self.store.write().await.upsert(batch);
            Ok(())
        })
        .await;
        info!("💾 Saved {} stories ({} failed)", report.saved, report.failed);
        Ok(report)
    }

    async fn get_story(&self, id: &str) -> Result<Option<StoredStory>> {
        Ok(self.store.read().await.stories.get(id).cloned())
    }

    async fn list_stories(&self, query: &StoryQuery) -> Result<StoryPage> {
        Ok(self.store.read().await.list(query))
    }

    async fn get_unprocessed(&self, limit: usize) -> Result<Vec<StoredStory>> {
        let store = self.store.read().await;
        let mut pending: Vec<&StoredStory> = store.stories.values().filter(|s| !s.processed).collect();
        pending.sort_by(|a, b| listing_order(a, b));
        Ok(pending.into_iter().take(limit).cloned().collect())
    }

    async fn update_enrichment(&self, id: &str, enrichment: &Enrichment) -> Result<()> {
        let mut store = self.store.write().await;
        let stored = store.story_mut(id)?;
        stored.story.category = enrichment.category;
        stored.enrichment = Some(enrichment.clone());
        stored.processed = true;
        stored.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn increment_views(&self, id: &str) -> Result<()> {
        self.store.write().await.story_mut(id)?.engagement.views += 1;
        Ok(())
    }

    async fn increment_shares(&self, id: &str) -> Result<()> {
        self.store.write().await.story_mut(id)?.engagement.shares += 1;
        Ok(())
    }

    async fn toggle_like(&self, id: &str, user_id: &str) -> Result<LikeStatus> {
        let mut store = self.store.write().await;
        let engagement = &mut store.story_mut(id)?.engagement;

        let liked = match engagement.liked_by.iter().position(|u| u == user_id) {
            Some(pos) => {
                engagement.liked_by.remove(pos);
                engagement.likes = engagement.likes.saturating_sub(1);
                false
            }
            None => {
                engagement.liked_by.push(user_id.to_string());
                engagement.likes += 1;
                true
            }
        };
        Ok(LikeStatus {
            liked,
            likes: engagement.likes,
        })
    }

    async fn add_comment(&self, id: &str, comment: NewComment) -> Result<Comment> {
        comment.validate()?;
        let mut store = self.store.write().await;
        store.story_mut(id)?.engagement.comment_count += 1;

        let created_at = Utc::now();
        let seq = self.next_comment.fetch_add(1, Ordering::Relaxed);
        let comment = Comment {
            id: comment_id(id, &comment.user_id, created_at, seq),
            story_id: id.to_string(),
            user_id: comment.user_id,
            username: comment.username,
            text: comment.text,
            created_at,
            reported: false,
        };
        store.comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comments(&self, id: &str, limit: usize) -> Result<Vec<Comment>> {
        let store = self.store.read().await;
        if !store.stories.contains_key(id) {
            return Err(Error::NotFound(format!("story {}", id)));
        }
        // Pushed in creation order, so reversing gives newest first.
        Ok(store
            .comments
            .iter()
            .rev()
            .filter(|c| c.story_id == id && !c.reported)
            .take(limit.clamp(1, MAX_COMMENTS_PAGE))
            .cloned()
            .collect())
    }

    async fn report_comment(&self, comment_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let comment = store
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| Error::NotFound(format!("comment {}", comment_id)))?;
        comment.reported = true;
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut store = self.store.write().await;
        let before = store.stories.len();
        store.stories.retain(|_, s| s.story.pub_date >= cutoff);
        let removed = before - store.stories.len();

        let MemoryStore { stories, comments } = &mut *store;
        comments.retain(|c| stories.contains_key(&c.story_id));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fixtures::{published, rejected, story};
    use gh_core::{Category, SortOrder};

    async fn seeded() -> (MemoryStorage, Vec<String>) {
        let storage = MemoryStorage::new();
        let stories = vec![
            story("Storm hits coast", 1, Category::World),
            story("Election results delayed", 2, Category::Politics),
            story("Local team wins again", 3, Category::Sports),
            story("Chip maker posts record profit", 4, Category::Business),
            story("Celebrity spotted at cafe", 5, Category::Entertainment),
        ];
        let ids: Vec<String> = stories.iter().map(|s| s.content_hash()).collect();
        storage.save_stories(&stories).await.unwrap();
        (storage, ids)
    }

    #[tokio::test]
    async fn test_save_is_idempotent_and_keeps_engagement() {
        let (storage, ids) = seeded().await;
        storage.increment_views(&ids[0]).await.unwrap();
        storage.update_enrichment(&ids[0], &published(Category::Business)).await.unwrap();

        let report = storage
            .save_stories(&[story("Storm hits coast", 1, Category::World)])
            .await
            .unwrap();
        assert_eq!(report.saved, 1);
        assert_eq!(storage.len().await, 5);

        let stored = storage.get_story(&ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.engagement.views, 1);
        assert!(stored.processed);
        assert_eq!(stored.story.category, Category::Business);
    }

    #[tokio::test]
    async fn test_unprocessed_and_enrichment() {
        let (storage, ids) = seeded().await;
        assert_eq!(storage.get_unprocessed(10).await.unwrap().len(), 5);
        assert_eq!(storage.get_unprocessed(2).await.unwrap()[0].id, ids[0]);

        storage.update_enrichment(&ids[0], &published(Category::World)).await.unwrap();
        storage.update_enrichment(&ids[4], &rejected(Category::Entertainment)).await.unwrap();

        let pending = storage.get_unprocessed(10).await.unwrap();
        assert_eq!(pending.len(), 3);
        assert!(pending.iter().all(|s| s.id != ids[0] && s.id != ids[4]));

        let stored = storage.get_story(&ids[0]).await.unwrap().unwrap();
        assert!(stored.processed_at.is_some());

        let missing = storage.update_enrichment("nope", &published(Category::World)).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_listing_filters_and_paginates() {
        let (storage, ids) = seeded().await;
        for id in &ids {
            storage.update_enrichment(id, &published(Category::World)).await.unwrap();
        }
        // Sports never lists, rejected stories have no summary.
        storage.update_enrichment(&ids[2], &published(Category::Sports)).await.unwrap();
        storage.update_enrichment(&ids[4], &rejected(Category::World)).await.unwrap();

        let query = StoryQuery { limit: 2, ..StoryQuery::default() };
        let first = storage.list_stories(&query).await.unwrap();
        let first_ids: Vec<&str> = first.stories.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(first_ids, vec![ids[0].as_str(), ids[1].as_str()]);
        assert!(first.has_more);
        assert_eq!(first.next_cursor.as_deref(), Some(ids[1].as_str()));

        let second = storage
            .list_stories(&StoryQuery { cursor: first.next_cursor.clone(), ..query.clone() })
            .await
            .unwrap();
        assert_eq!(second.stories.len(), 1);
        assert_eq!(second.stories[0].id, ids[3]);
        assert!(!second.has_more);
        assert_eq!(second.next_cursor, None);
    }

    #[tokio::test]
    async fn test_listing_by_category_and_popularity() {
        let (storage, ids) = seeded().await;
        storage.update_enrichment(&ids[0], &published(Category::World)).await.unwrap();
        storage.update_enrichment(&ids[1], &published(Category::Politics)).await.unwrap();
        storage.update_enrichment(&ids[3], &published(Category::Politics)).await.unwrap();
        storage.toggle_like(&ids[3], "u1").await.unwrap();

        let politics = storage
            .list_stories(&StoryQuery { category: Some(Category::Politics), ..StoryQuery::default() })
            .await
            .unwrap();
        assert_eq!(politics.stories.len(), 2);
        assert_eq!(politics.stories[0].id, ids[1]);

        let popular = storage
            .list_stories(&StoryQuery { sort: SortOrder::Popular, ..StoryQuery::default() })
            .await
            .unwrap();
        assert_eq!(popular.stories[0].id, ids[3]);
        assert_eq!(popular.stories.len(), 3);
    }

    #[tokio::test]
    async fn test_toggle_like() {
        let (storage, ids) = seeded().await;
        let liked = storage.toggle_like(&ids[0], "u1").await.unwrap();
        assert_eq!(liked, LikeStatus { liked: true, likes: 1 });
        storage.toggle_like(&ids[0], "u2").await.unwrap();
        let unliked = storage.toggle_like(&ids[0], "u1").await.unwrap();
        assert_eq!(unliked, LikeStatus { liked: false, likes: 1 });

        let stored = storage.get_story(&ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.engagement.liked_by, vec!["u2"]);
        assert!(storage.toggle_like("nope", "u1").await.is_err());
    }

    #[tokio::test]
    async fn test_comments() {
        let (storage, ids) = seeded().await;
        let new = |text: &str| NewComment {
            user_id: "u1".to_string(),
            username: "ana".to_string(),
            text: text.to_string(),
        };

        let first = storage.add_comment(&ids[0], new("First")).await.unwrap();
        storage.add_comment(&ids[0], new("Second")).await.unwrap();
        storage.add_comment(&ids[1], new("Elsewhere")).await.unwrap();
        assert!(storage.add_comment(&ids[0], new("")).await.is_err());
        assert!(storage.add_comment("nope", new("Lost")).await.is_err());

        let comments = storage.get_comments(&ids[0], 50).await.unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Second", "First"]);

        storage.report_comment(&first.id).await.unwrap();
        assert_eq!(storage.get_comments(&ids[0], 50).await.unwrap().len(), 1);
        assert_eq!(storage.get_comments(&ids[0], 0).await.unwrap().len(), 1);

        let stored = storage.get_story(&ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.engagement.comment_count, 2);
    }

    #[tokio::test]
    async fn test_views_shares_and_retention() {
        let (storage, ids) = seeded().await;
        storage.increment_views(&ids[1]).await.unwrap();
        storage.increment_shares(&ids[1]).await.unwrap();
        storage.increment_shares(&ids[1]).await.unwrap();
        let stored = storage.get_story(&ids[1]).await.unwrap().unwrap();
        assert_eq!((stored.engagement.views, stored.engagement.shares), (1, 2));

        storage
            .add_comment(
                &ids[4],
                NewComment { user_id: "u".into(), username: "u".into(), text: "old".into() },
            )
            .await
            .unwrap();
        let cutoff = stored.story.pub_date - chrono::Duration::minutes(30);
        assert_eq!(storage.delete_older_than(cutoff).await.unwrap(), 3);
        assert_eq!(storage.len().await, 2);
        assert!(storage.get_story(&ids[4]).await.unwrap().is_none());
        assert!(storage.store.read().await.comments.is_empty());
    }
}
