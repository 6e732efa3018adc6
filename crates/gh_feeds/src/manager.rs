use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gh_core::{Enricher, Enrichment, Error, FeedReader, Result, StoredStory, StoryStorage};
use gh_dedup::{DedupReport, Deduplicator};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Pacing for enrichment runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnrichConfig {
    pub max_per_run: usize,
    /// Stories enriched, one after another, between two pauses.
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            max_per_run: 50,
            batch_size: 10,
            batch_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub fetched: usize,
    pub dedup: DedupReport,
    pub saved: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichReport {
    pub candidates: usize,
    pub processed: usize,
    pub published: usize,
    pub rejected: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Drives fetch, grouping, persistence and enrichment.
pub struct IngestionManager {
    reader: Arc<dyn FeedReader>,
    storage: Arc<dyn StoryStorage>,
    enricher: Arc<dyn Enricher>,
    dedup: Deduplicator,
    enrich_config: EnrichConfig,
}

impl IngestionManager {
    pub fn new(
        reader: Arc<dyn FeedReader>,
        storage: Arc<dyn StoryStorage>,
        enricher: Arc<dyn Enricher>,
        dedup: Deduplicator,
    ) -> Self {
        Self {
            reader,
            storage,
            enricher,
            dedup,
            enrich_config: EnrichConfig::default(),
        }
    }

    pub fn with_enrich_config(mut self, config: EnrichConfig) -> Self {
        self.enrich_config = config;
        self
    }

    pub fn storage(&self) -> Arc<dyn StoryStorage> {
        self.storage.clone()
    }

    /// Fetches every source, groups the batch and upserts the groups.
    pub async fn run_ingestion(&self) -> Result<IngestReport> {
        info!("🚀 Starting ingestion run");
        let articles = self.reader.fetch_all().await?;
        if articles.is_empty() {
            warn!("📭 No articles fetched");
            return Ok(IngestReport::default());
        }

        let (groups, dedup) = self.dedup.run(&articles);
        let saved = self.storage.save_stories(&groups).await?;

        for error in &saved.errors {
            warn!("💾 {}", error);
        }
        info!(
            "💾 Stored {} stories ({} failed) from {} articles",
            saved.saved,
            saved.failed,
            articles.len()
        );

        Ok(IngestReport {
            fetched: articles.len(),
            dedup,
            saved: saved.saved,
            failed: saved.failed,
            errors: saved.errors,
        })
    }

    /// Enriches up to `limit` unprocessed stories (the configured maximum when `None`).
    pub async fn run_enrichment(&self, limit: Option<usize>) -> Result<EnrichReport> {
        let limit = limit.unwrap_or(self.enrich_config.max_per_run);
        let pending = self.storage.get_unprocessed(limit).await?;
        let mut report = EnrichReport {
            candidates: pending.len(),
            ..EnrichReport::default()
        };
        if pending.is_empty() {
            info!("🤷 No unprocessed stories");
            return Ok(report);
        }
        info!("🤖 Enriching {} stories with {}", pending.len(), self.enricher.name());

        let batches: Vec<&[StoredStory]> = pending.chunks(self.enrich_config.batch_size.max(1)).collect();
        for (i, batch) in batches.iter().enumerate() {
            for story in batch.iter() {
                match self.enrich_one(story).await {
                    Ok(enrichment) => {
                        report.processed += 1;
                        if enrichment.should_publish {
                            report.published += 1;
                        } else {
                            report.rejected += 1;
                        }
                    }
                    Err(e) => {
                        warn!("✗ Enrichment failed for {}: {}", story.id, e);
                        report.failed += 1;
                        report.errors.push(format!("{}: {}", story.id, e));
                    }
                }
            }

            if i + 1 < batches.len() && self.enrich_config.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.enrich_config.batch_delay_ms)).await;
            }
        }

        info!(
            "✨ Enrichment complete: {} published, {} rejected, {} failed",
            report.published, report.rejected, report.failed
        );
        Ok(report)
    }

    async fn enrich_one(&self, stored: &StoredStory) -> Result<Enrichment> {
        let enrichment = self.enricher.enrich(&stored.story).await?;
        self.storage.update_enrichment(&stored.id, &enrichment).await?;
        Ok(enrichment)
    }

    /// Removes stories published more than `retention_days` ago.
    pub async fn cleanup(&self, retention_days: i64) -> Result<usize> {
        let cutoff = chrono::Duration::try_days(retention_days)
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
            .ok_or_else(|| Error::Validation(format!("retention of {} days is out of range", retention_days)))?;
        let removed = self.storage.delete_older_than(cutoff).await?;
        info!("🧹 Removed {} stories older than {} days", removed, retention_days);
        Ok(removed)
    }
}
