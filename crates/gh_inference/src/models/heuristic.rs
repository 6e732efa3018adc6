use async_trait::async_trait;
use gh_core::text::truncate_with_ellipsis;
use gh_core::{Enricher, Enrichment, Result, StoryGroup};

use crate::prompts::{image_keywords, QualityVerdict};
use crate::{MIN_QUALITY_SCORE, SUMMARY_MAX_CHARS};

/// Offline enricher: scores stories by description length and corroboration
/// and summarizes them from their own descriptions.
#[derive(Debug, Clone)]
pub struct HeuristicEnricher {
    min_quality_score: u8,
}

impl Default for HeuristicEnricher {
    fn default() -> Self {
        Self::new(MIN_QUALITY_SCORE)
    }
}

impl HeuristicEnricher {
    pub fn new(min_quality_score: u8) -> Self {
        Self { min_quality_score }
    }

    fn evaluate(&self, story: &StoryGroup) -> QualityVerdict {
        let chars = story.description.chars().count();
        let base: u8 = match chars {
            0..=39 => 2,
            40..=119 => 4,
            120..=299 => 6,
            _ => 7,
        };
        let corroboration = story.source_diversity.saturating_sub(1).min(3) as u8;

        let reason = if story.source_diversity > 1 {
            format!("{} characters of description, reported by {} sources", chars, story.source_diversity)
        } else {
            format!("{} characters of description from a single source", chars)
        };

        QualityVerdict {
            score: (base + corroboration).min(10),
            reason,
        }
    }
}

/// The first two distinct sentences of `text`.
fn lead_sentences(text: &str) -> String {
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let ends = matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |next| next.is_whitespace());
        if ends || chars.peek().is_none() {
            let sentence = current.trim().to_string();
            current.clear();
            if sentence.is_empty() {
                continue;
            }
            if !sentences.iter().any(|s| s.eq_ignore_ascii_case(&sentence)) {
                sentences.push(sentence);
            }
            if sentences.len() == 2 {
                break;
            }
        }
    }

    sentences.join(" ")
}

#[async_trait]
impl Enricher for HeuristicEnricher {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn enrich(&self, story: &StoryGroup) -> Result<Enrichment> {
        let verdict = self.evaluate(story);
        let mut enrichment = Enrichment {
            should_publish: false,
            quality_score: verdict.score,
            quality_reason: verdict.reason,
            category: story.category,
            summary: None,
            daily_life_impact: None,
            image_keywords: None,
        };

        if verdict.score < self.min_quality_score {
            tracing::debug!("Rejected low-quality story (score {}): {}", verdict.score, story.title);
            return Ok(enrichment);
        }

        let source_text = if story.combined_description.is_empty() {
            &story.description
        } else {
            &story.combined_description
        };
        let summary = lead_sentences(source_text);
        let summary = if summary.is_empty() { story.title.clone() } else { summary };

        enrichment.summary = Some(truncate_with_ellipsis(&summary, SUMMARY_MAX_CHARS));
        enrichment.image_keywords = Some(image_keywords(&story.title, story.category));
        enrichment.should_publish = true;
        Ok(enrichment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gh_core::{Category, SourceLink};
    use url::Url;

    fn story(description: &str, sources: &[&str]) -> StoryGroup {
        let n = sources.len();
        let pub_date = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        StoryGroup {
            title: "Senate passes budget bill".to_string(),
            description: description.to_string(),
            link: Url::parse("https://news.example.com/budget").unwrap(),
            source: sources[0].to_string(),
            original_id: String::new(),
            image_url: None,
            pub_date,
            category: Category::Politics,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            descriptions: vec![description.to_string(); n],
            links: sources
                .iter()
                .map(|s| SourceLink {
                    source: s.to_string(),
                    url: "https://news.example.com/budget".to_string(),
                })
                .collect(),
            categories: vec![Category::Politics; n],
            pub_dates: vec![pub_date; n],
            source_diversity: n,
            unique_categories: vec![Category::Politics],
            combined_description: vec![description; n].join(" "),
        }
    }

    #[tokio::test]
    async fn test_short_description_is_rejected() {
        let enrichment = HeuristicEnricher::default().enrich(&story("Too short.", &["A"])).await.unwrap();
        assert!(!enrichment.should_publish);
        assert_eq!(enrichment.quality_score, 2);
        assert_eq!(enrichment.summary, None);
        assert_eq!(enrichment.category, Category::Politics);
    }

    #[tokio::test]
    async fn test_corroborated_story_is_published() {
        let description = "The Senate passed the budget bill late on Friday. The vote was 51 to 49. It now goes to the House.";
        let enrichment = HeuristicEnricher::default()
            .enrich(&story(description, &["A", "B", "C"]))
            .await
            .unwrap();

        assert!(enrichment.should_publish);
        assert_eq!(enrichment.quality_score, 6);
        assert!(enrichment.quality_reason.contains("3 sources"));
        assert_eq!(
            enrichment.summary.as_deref(),
            Some("The Senate passed the budget bill late on Friday. The vote was 51 to 49.")
        );
        assert_eq!(enrichment.image_keywords.as_deref(), Some("senate passes budget"));
        assert_eq!(enrichment.daily_life_impact, None);
    }

    #[test]
    fn test_lead_sentences() {
        assert_eq!(lead_sentences("One. One. Two! Three?"), "One. Two!");
        assert_eq!(lead_sentences("Version 2.0 ships today"), "Version 2.0 ships today");
        assert_eq!(lead_sentences("   "), "");
    }

    #[test]
    fn test_score_is_capped() {
        let long = "word ".repeat(100);
        let verdict = HeuristicEnricher::default().evaluate(&story(&long, &["A", "B", "C", "D", "E", "F"]));
        assert_eq!(verdict.score, 10);
    }
}
