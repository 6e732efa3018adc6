use chrono::Duration;
use gh_core::{RawArticle, StoryGroup};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DedupConfig;
use crate::error::{DedupError, Result};
use crate::keywords::bucket_key;
use crate::merge::{singleton, StoryGroupBuilder};
use crate::prefilter::filter_duplicate_titles;
use crate::similarity::similarity;

/// Counters describing one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupReport {
    pub input: usize,
    pub after_prefilter: usize,
    pub groups: usize,
    /// Articles folded into another article's group.
    pub merged: usize,
    /// The pass failed and the input was passed through as singletons.
    pub degraded: bool,
}

/// Collapses near-duplicate coverage of the same event into story groups.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    pub fn group_articles(&self, articles: &[RawArticle]) -> Vec<StoryGroup> {
        self.run(articles).0
    }

    /// Groups `articles` and reports what happened.
    ///
    /// Never fails: if the pass errors out, every input article comes back as
    /// its own group and the report is flagged as degraded.
    pub fn run(&self, articles: &[RawArticle]) -> (Vec<StoryGroup>, DedupReport) {
        if articles.is_empty() {
            return (Vec::new(), DedupReport::default());
        }

        match self.try_group(articles) {
            Ok((groups, after_prefilter)) => {
                let report = DedupReport {
                    input: articles.len(),
                    after_prefilter,
                    groups: groups.len(),
                    merged: after_prefilter - groups.len(),
                    degraded: false,
                };
                info!(
                    "🧮 Deduplicated {} articles into {} groups ({} near-duplicate titles dropped, {} merged)",
                    articles.len(),
                    groups.len(),
                    articles.len() - after_prefilter,
                    report.merged
                );
                (groups, report)
            }
            Err(e) => {
                warn!("⚠️ Deduplication failed, passing {} articles through: {}", articles.len(), e);
                let groups: Vec<StoryGroup> = articles.iter().map(singleton).collect();
                let report = DedupReport {
                    input: articles.len(),
                    after_prefilter: articles.len(),
                    groups: groups.len(),
                    merged: 0,
                    degraded: true,
                };
                (groups, report)
            }
        }
    }

    /// Whether `candidate` belongs in the group anchored at `anchor`.
    pub fn matches(&self, anchor: &RawArticle, candidate: &RawArticle) -> bool {
        let delta = candidate.pub_date - anchor.pub_date;
        let gap = if delta < Duration::zero() { -delta } else { delta };
        self.config.time_window().is_some_and(|window| gap < window)
            && similarity(&anchor.title, &candidate.title) >= self.config.similarity_threshold
    }

    fn try_group(&self, articles: &[RawArticle]) -> Result<(Vec<StoryGroup>, usize)> {
        self.config.validate()?;

        let mut sorted = filter_duplicate_titles(articles, self.config.near_duplicate_threshold);
        sorted.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));

        let mut buckets: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (idx, article) in sorted.iter().enumerate() {
            buckets
                .entry(bucket_key(&article.title, self.config.bucket_keywords))
                .or_default()
                .push(idx);
        }
        debug!("Sorted {} articles into {} buckets", sorted.len(), buckets.len());

        let mut processed = vec![false; sorted.len()];
        let mut groups = Vec::new();

        for members in buckets.values() {
            for (pos, &anchor_idx) in members.iter().enumerate() {
                if processed[anchor_idx] {
                    continue;
                }
                let anchor = sorted[anchor_idx];
                let mut builder = StoryGroupBuilder::new(anchor);

                for &candidate_idx in &members[pos + 1..] {
                    if processed[candidate_idx] {
                        continue;
                    }
                    let candidate = sorted[candidate_idx];
                    if self.matches(anchor, candidate) {
                        builder.merge(candidate);
                        processed[candidate_idx] = true;
                    }
                }

                processed[anchor_idx] = true;
                groups.push(builder.finish());
            }
        }

        let assigned: usize = groups.iter().map(|g| g.source_diversity).sum();
        if assigned != sorted.len() || processed.iter().any(|done| !done) {
            return Err(DedupError::PartitionViolation {
                assigned,
                expected: sorted.len(),
            });
        }
        if let Some(group) = groups.iter().find(|g| !g.is_consistent()) {
            return Err(DedupError::InconsistentGroup(group.title.clone()));
        }

        Ok((groups, sorted.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use gh_core::Category;
    use url::Url;

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, min, sec).unwrap()
    }

    fn article(title: &str, source: &str, pub_date: DateTime<Utc>) -> RawArticle {
        RawArticle {
            title: title.to_string(),
            description: format!("{} reports: {}", source, title),
            link: Url::parse(&format!("https://{}.example.com/{}", source.to_lowercase(), title.len())).unwrap(),
            pub_date,
            source: source.to_string(),
            category: Category::General,
            image_url: None,
            original_id: String::new(),
        }
    }

    #[test]
    fn test_anchor_is_newest_member() {
        let articles = vec![
            article("Senate passes budget bill", "A", at(8, 0, 0)),
            article("Senate passes budget bill after late night vote", "B", at(10, 0, 0)),
        ];
        let groups = Deduplicator::default().group_articles(&articles);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].sources, vec!["B", "A"]);
        assert_eq!(groups[0].pub_date, at(10, 0, 0));
        assert_eq!(groups[0].title, "Senate passes budget bill after late night vote");
    }

    #[test]
    fn test_different_buckets_never_merge() {
        // Same wording, but only the first title yields the keyword "budget".
        let articles = vec![
            article("Senate passes budget", "A", at(8, 0, 0)),
            article("Senate passes it", "B", at(8, 5, 0)),
        ];
        let groups = Deduplicator::default().group_articles(&articles);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_matching_is_anchor_relative() {
        let dedup = Deduplicator::default();
        let anchor = article("Senate passes budget bill", "A", at(12, 0, 0));
        let near = article("Senate passes budget bill after late night vote", "B", at(11, 0, 0));
        assert!(dedup.matches(&anchor, &near));
        assert!(dedup.matches(&near, &anchor));
    }

    #[test]
    fn test_invalid_config_degrades_to_singletons() {
        let config = DedupConfig::default().with_similarity_threshold(2.0);
        let articles = vec![
            article("Storm hits coast", "A", at(8, 0, 0)),
            article("Storm hits coast", "B", at(9, 0, 0)),
        ];
        let (groups, report) = Deduplicator::new(config).run(&articles);
        assert!(report.degraded);
        // The pre-filter is bypassed too: the exact duplicate survives.
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].sources, vec!["A"]);
        assert_eq!(groups[1].sources, vec!["B"]);
        assert!(groups.iter().all(|g| g.is_singleton()));
    }

    #[test]
    fn test_oversized_window_degrades_instead_of_panicking() {
        let config = DedupConfig::default().with_time_window_hours(i64::MAX);
        let articles = vec![
            article("Senate passes budget bill", "A", at(8, 0, 0)),
            article("Senate passes budget bill after late night vote", "B", at(9, 0, 0)),
        ];
        let dedup = Deduplicator::new(config);
        assert!(!dedup.matches(&articles[0], &articles[1]));

        let (groups, report) = dedup.run(&articles);
        assert!(report.degraded);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.is_singleton()));
    }

    #[test]
    fn test_report_counts() {
        let articles = vec![
            article("Senate passes budget bill", "A", at(8, 0, 0)),
            article("Senate passes budget bill", "B", at(8, 1, 0)),
            article("Senate passes budget bill after late night vote", "C", at(9, 0, 0)),
            article("Local bakery wins award", "D", at(9, 30, 0)),
        ];
        let (groups, report) = Deduplicator::default().run(&articles);
        assert_eq!(
            report,
            DedupReport { input: 4, after_prefilter: 3, groups: 2, merged: 1, degraded: false }
        );
        assert_eq!(groups.len(), 2);
    }
}
