use std::cmp::Ordering;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use gh_core::text::content_hash;
use gh_core::{Error, Result, SaveReport, SortOrder, StoredStory, StoryGroup, StoryPage, StoryQuery};
use tracing::{debug, warn};

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// Most stories written in one commit.
pub const SAVE_BATCH_SIZE: usize = 499;
pub const SAVE_ATTEMPTS: u32 = 3;

fn check_story(story: &StoryGroup) -> Result<()> {
    if story.title.trim().is_empty() {
        return Err(Error::InvalidArticle("story has no title".to_string()));
    }
    if story.source_diversity == 0 || !story.is_consistent() {
        return Err(Error::InvalidArticle(format!(
            "inconsistent member lists ({} sources declared)",
            story.source_diversity
        )));
    }
    Ok(())
}

/// Validates `stories` and hands them to `commit` in chunks of
/// [`SAVE_BATCH_SIZE`], retrying a failed chunk with exponential backoff.
pub(crate) async fn save_in_batches<F, Fut>(
    stories: &[StoryGroup],
    fetched_at: DateTime<Utc>,
    backoff: Duration,
    mut commit: F,
) -> SaveReport
where
    F: FnMut(Vec<StoredStory>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut report = SaveReport::default();
    let mut ready = Vec::with_capacity(stories.len());
    for story in stories {
        match check_story(story) {
            Ok(()) => ready.push(StoredStory::new(story.clone(), fetched_at)),
            Err(e) => {
                report.failed += 1;
                report.errors.push(format!("{}: {}", story.title, e));
            }
        }
    }

    let batches: Vec<&[StoredStory]> = ready.chunks(SAVE_BATCH_SIZE).collect();
    for (i, batch) in batches.iter().enumerate() {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match commit(batch.to_vec()).await {
                Ok(()) => {
                    report.saved += batch.len();
                    debug!("Committed batch {}/{}", i + 1, batches.len());
                    break;
                }
                Err(e) if attempt < SAVE_ATTEMPTS => {
                    warn!("Batch {} attempt {} failed: {}", i + 1, attempt, e);
                    tokio::time::sleep(backoff * 2u32.pow(attempt)).await;
                }
                Err(e) => {
                    warn!("Batch {} failed after {} attempts: {}", i + 1, attempt, e);
                    report.failed += batch.len();
                    report
                        .errors
                        .push(format!("batch {}: {} ({} stories)", i + 1, e, batch.len()));
                    break;
                }
            }
        }
    }
    report
}

/// Fixed-width UTC timestamp, so stored values sort lexically.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn comment_id(story_id: &str, user_id: &str, created_at: DateTime<Utc>, seq: u64) -> String {
    content_hash(&format!("{}:{}:{}:{}", story_id, user_id, timestamp(created_at), seq))
}

/// Listing order: newest first, ties broken by id.
pub(crate) fn listing_order(a: &StoredStory, b: &StoredStory) -> Ordering {
    b.story.pub_date.cmp(&a.story.pub_date).then_with(|| a.id.cmp(&b.id))
}

/// Turns up to `limit + 1` ordered stories into a page.
pub(crate) fn finish_page(mut stories: Vec<StoredStory>, query: &StoryQuery) -> StoryPage {
    let limit = query.effective_limit();
    let has_more = stories.len() > limit;
    stories.truncate(limit);
    let next_cursor = if has_more {
        stories.last().map(|s| s.id.clone())
    } else {
        None
    };

    if query.sort == SortOrder::Popular {
        stories.sort_by(|a, b| {
            b.engagement
                .score()
                .partial_cmp(&a.engagement.score())
                .unwrap_or(Ordering::Equal)
        });
    }

    StoryPage {
        stories,
        next_cursor,
        has_more,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{Duration, TimeZone, Utc};
    use gh_core::{Category, Enrichment, SourceLink, StoryGroup};
    use url::Url;

    pub fn story(title: &str, hours_ago: i64, category: Category) -> StoryGroup {
        let pub_date = Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap() - Duration::hours(hours_ago);
        let link = Url::parse(&format!("https://news.example.com/{}", title.len())).unwrap();
        StoryGroup {
            title: title.to_string(),
            description: format!("{} in detail", title),
            link: link.clone(),
            source: "A".to_string(),
            original_id: String::new(),
            image_url: None,
            pub_date,
            category,
            sources: vec!["A".to_string()],
            descriptions: vec![format!("{} in detail", title)],
            links: vec![SourceLink {
                source: "A".to_string(),
                url: link.to_string(),
            }],
            categories: vec![category],
            pub_dates: vec![pub_date],
            source_diversity: 1,
            unique_categories: vec![category],
            combined_description: format!("{} in detail", title),
        }
    }

    pub fn published(category: Category) -> Enrichment {
        Enrichment {
            should_publish: true,
            quality_score: 7,
            quality_reason: "Relevant".to_string(),
            category,
            summary: Some("A short summary.".to_string()),
            daily_life_impact: None,
            image_keywords: Some("news".to_string()),
        }
    }

    pub fn rejected(category: Category) -> Enrichment {
        Enrichment {
            should_publish: false,
            quality_score: 2,
            quality_reason: "Gossip".to_string(),
            category,
            summary: None,
            daily_life_impact: None,
            image_keywords: None,
        }
    }
}
