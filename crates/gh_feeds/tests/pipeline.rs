use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gh_core::{Category, Enricher, Enrichment, Error, FeedReader, RawArticle, Result, StoryGroup, StoryQuery, StoryStorage};
use gh_dedup::Deduplicator;
use gh_feeds::{EnrichConfig, IngestionManager};
use gh_inference::HeuristicEnricher;
use gh_storage::MemoryStorage;
use url::Url;

struct StaticReader {
    articles: Vec<RawArticle>,
}

#[async_trait]
impl FeedReader for StaticReader {
    async fn fetch_all(&self) -> Result<Vec<RawArticle>> {
        Ok(self.articles.clone())
    }
}

/// Fails on one title and defers to the heuristic enricher otherwise.
#[derive(Debug)]
struct FlakyEnricher {
    fail_on: &'static str,
    inner: HeuristicEnricher,
}

#[async_trait]
impl Enricher for FlakyEnricher {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn enrich(&self, story: &StoryGroup) -> Result<Enrichment> {
        if story.title == self.fail_on {
            return Err(Error::Inference("model unavailable".to_string()));
        }
        self.inner.enrich(story).await
    }
}

/// Records the highest number of stories it was asked to enrich at once.
#[derive(Debug, Default)]
struct CountingEnricher {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    inner: HeuristicEnricher,
}

#[async_trait]
impl Enricher for CountingEnricher {
    fn name(&self) -> &str {
        "counting"
    }

    async fn enrich(&self, story: &StoryGroup) -> Result<Enrichment> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let result = self.inner.enrich(story).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

const LONG: &str = "Officials confirmed the details late on Monday. Residents were told to expect updates through the week.";

fn article(title: &str, source: &str, description: &str, category: Category, pub_date: DateTime<Utc>) -> RawArticle {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    RawArticle {
        title: title.to_string(),
        description: description.to_string(),
        link: Url::parse(&format!("https://{}.example.com/{}", source.to_lowercase(), slug)).unwrap(),
        pub_date,
        source: source.to_string(),
        category,
        image_url: None,
        original_id: String::new(),
    }
}

fn batch(now: DateTime<Utc>) -> Vec<RawArticle> {
    vec![
        article("Senate passes budget bill", "A", LONG, Category::Politics, now - Duration::hours(1)),
        article(
            "Senate passes budget bill after late night vote",
            "B",
            LONG,
            Category::Politics,
            now - Duration::hours(2),
        ),
        article("Local bakery wins award", "C", "Cakes.", Category::General, now - Duration::hours(3)),
        article("Championship parade draws record crowds", "D", LONG, Category::Sports, now - Duration::hours(4)),
        article("Harbor crane collapse halts shipping", "E", LONG, Category::Business, now - Duration::days(40)),
    ]
}

fn manager(storage: Arc<MemoryStorage>, enricher: Arc<dyn Enricher>, articles: Vec<RawArticle>) -> IngestionManager {
    IngestionManager::new(
        Arc::new(StaticReader { articles }),
        storage,
        enricher,
        Deduplicator::default(),
    )
    .with_enrich_config(EnrichConfig {
        batch_delay_ms: 0,
        ..EnrichConfig::default()
    })
}

#[tokio::test]
async fn test_ingest_enrich_list_cleanup() {
    let storage = Arc::new(MemoryStorage::new());
    let manager = manager(storage.clone(), Arc::new(HeuristicEnricher::default()), batch(Utc::now()));

    let report = manager.run_ingestion().await.unwrap();
    assert_eq!(report.fetched, 5);
    assert_eq!(report.dedup.groups, 4);
    assert_eq!(report.saved, 4);
    assert_eq!(report.failed, 0);

    // Re-ingesting the same batch updates in place.
    manager.run_ingestion().await.unwrap();
    assert_eq!(storage.len().await, 4);

    let enriched = manager.run_enrichment(None).await.unwrap();
    assert_eq!(enriched.candidates, 4);
    assert_eq!(enriched.processed, 4);
    assert_eq!(enriched.published, 3);
    assert_eq!(enriched.rejected, 1);
    assert_eq!(enriched.failed, 0);
    assert_eq!(manager.run_enrichment(None).await.unwrap().candidates, 0);

    // Sports and rejected stories stay out of the listing.
    let page = storage.list_stories(&StoryQuery::default()).await.unwrap();
    let titles: Vec<&str> = page.stories.iter().map(|s| s.story.title.as_str()).collect();
    assert_eq!(titles, vec!["Senate passes budget bill", "Harbor crane collapse halts shipping"]);
    assert_eq!(page.stories[0].story.sources, vec!["A", "B"]);
    assert!(page.stories[0].enrichment.as_ref().unwrap().summary.is_some());

    assert_eq!(manager.cleanup(30).await.unwrap(), 1);
    let page = storage.list_stories(&StoryQuery::default()).await.unwrap();
    assert_eq!(page.stories.len(), 1);
}

#[tokio::test]
async fn test_enrichment_failure_leaves_story_pending() {
    let storage = Arc::new(MemoryStorage::new());
    let enricher = Arc::new(FlakyEnricher {
        fail_on: "Local bakery wins award",
        inner: HeuristicEnricher::default(),
    });
    let manager = manager(storage.clone(), enricher, batch(Utc::now()));
    manager.run_ingestion().await.unwrap();

    let report = manager.run_enrichment(Some(10)).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);

    let pending = storage.get_unprocessed(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].story.title, "Local bakery wins award");
}

#[tokio::test]
async fn test_enrichment_respects_limit() {
    let storage = Arc::new(MemoryStorage::new());
    let manager = manager(storage.clone(), Arc::new(HeuristicEnricher::default()), batch(Utc::now()));
    manager.run_ingestion().await.unwrap();

    let report = manager.run_enrichment(Some(2)).await.unwrap();
    assert_eq!(report.candidates, 2);
    assert_eq!(storage.get_unprocessed(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_fetch_saves_nothing() {
    let storage = Arc::new(MemoryStorage::new());
    let manager = manager(storage.clone(), Arc::new(HeuristicEnricher::default()), Vec::new());
    let report = manager.run_ingestion().await.unwrap();
    assert_eq!(report.fetched, 0);
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_enrichment_handles_one_story_at_a_time() {
    let storage = Arc::new(MemoryStorage::new());
    let enricher = Arc::new(CountingEnricher::default());
    let manager = manager(storage.clone(), enricher.clone(), batch(Utc::now()));
    manager.run_ingestion().await.unwrap();

    let report = manager.run_enrichment(None).await.unwrap();
    assert_eq!(report.processed, 4);
    assert_eq!(enricher.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cleanup_rejects_out_of_range_retention() {
    let storage = Arc::new(MemoryStorage::new());
    let manager = manager(storage.clone(), Arc::new(HeuristicEnricher::default()), batch(Utc::now()));
    manager.run_ingestion().await.unwrap();

    let err = manager.cleanup(i64::MAX).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = manager.cleanup(i64::MAX / 86_400_000).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(storage.len().await, 4);
}
