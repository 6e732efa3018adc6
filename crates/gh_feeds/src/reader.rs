use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use gh_core::{Error, FeedReader, RawArticle, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::circuit::{CircuitBreaker, MemoryCircuitStore};
use crate::logging::FeedLogger;
use crate::parser::parse_feed;
use crate::sources::{default_sources, is_valid_feed_url, FeedSource};

/// Fetch pacing for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestConfig {
    /// Sources fetched concurrently.
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// No new batch starts once a run has taken this long.
    pub max_processing_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 1000,
            max_processing_secs: 540,
            request_timeout_secs: 30,
            user_agent: "GlassHouse/0.1 (+rss reader)".to_string(),
        }
    }
}

enum Outcome {
    Fetched(Vec<RawArticle>),
    Skipped,
    Failed,
}

/// Reads every configured RSS source in paced batches.
pub struct RssFeedReader {
    client: Client,
    sources: Vec<FeedSource>,
    breaker: CircuitBreaker,
    config: IngestConfig,
}

impl RssFeedReader {
    pub fn new(sources: Vec<FeedSource>, breaker: CircuitBreaker, config: IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            sources,
            breaker,
            config,
        })
    }

    /// The built-in source list with an in-memory breaker.
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            default_sources(),
            CircuitBreaker::new(Arc::new(MemoryCircuitStore::new())),
            IngestConfig::default(),
        )
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Articles from a single source; empty when the source is skipped or fails.
    pub async fn fetch_source(&self, source: &FeedSource) -> Vec<RawArticle> {
        match self.fetch_outcome(source).await {
            Outcome::Fetched(articles) => articles,
            Outcome::Skipped | Outcome::Failed => Vec::new(),
        }
    }

    async fn fetch_outcome(&self, source: &FeedSource) -> Outcome {
        let log = FeedLogger::for_source(&source.name);
        let now = Utc::now();

        if self.breaker.should_skip(&source.name, now).await {
            return Outcome::Skipped;
        }

        if !is_valid_feed_url(&source.url) {
            log.warn(&format!("Invalid feed URL: {}", source.url));
            self.breaker.record_failure(&source.name, now).await;
            return Outcome::Failed;
        }

        log.debug(&format!("Fetching {}", source.url));
        let parsed = self
            .download(source)
            .await
            .and_then(|bytes| parse_feed(&bytes, source, now));

        match parsed {
            Ok(feed) => {
                self.breaker.record_success(&source.name).await;
                log.info(&format!(
                    "✓ {}/{} valid articles",
                    feed.articles.len(),
                    feed.total_items
                ));
                Outcome::Fetched(feed.articles)
            }
            Err(e) => {
                self.breaker.record_failure(&source.name, Utc::now()).await;
                log.warn(&format!("✗ {}", e));
                Outcome::Failed
            }
        }
    }

    async fn download(&self, source: &FeedSource) -> Result<Vec<u8>> {
        let response = self.client.get(&source.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Feed(format!("{} returned HTTP {}", source.name, status)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl FeedReader for RssFeedReader {
    async fn fetch_all(&self) -> Result<Vec<RawArticle>> {
        let started = Instant::now();
        let budget = Duration::from_secs(self.config.max_processing_secs);
        let batches: Vec<&[FeedSource]> = self.sources.chunks(self.config.batch_size.max(1)).collect();

        let mut articles = Vec::new();
        let (mut fetched, mut failed, mut skipped) = (0usize, 0usize, 0usize);

        for (i, batch) in batches.iter().enumerate() {
            if started.elapsed() > budget {
                warn!("⏱️ Processing time limit reached, {} batches left unfetched", batches.len() - i);
                break;
            }
            info!("📡 Fetching batch {}/{} ({} sources)", i + 1, batches.len(), batch.len());

            let outcomes = join_all(batch.iter().map(|source| self.fetch_outcome(source))).await;
            for outcome in outcomes {
                match outcome {
                    Outcome::Fetched(mut items) => {
                        fetched += 1;
                        articles.append(&mut items);
                    }
                    Outcome::Skipped => skipped += 1,
                    Outcome::Failed => failed += 1,
                }
            }

            if i + 1 < batches.len() && self.config.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        info!(
            "📰 Feed fetch complete: {} fetched, {} failed, {} skipped, {} articles",
            fetched,
            failed,
            skipped,
            articles.len()
        );
        Ok(articles)
    }
}
