use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gh_core::{Category, Enricher, Enrichment, Error, Result, StoryGroup};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::prompts::{
    category_prompt, image_keywords, impact_prompt, parse_category, parse_impact, parse_quality,
    parse_summary, quality_prompt, summary_prompt, wants_impact, QualityVerdict, SummaryDraft,
};
use crate::rate_limit::RateLimiter;
use crate::InferenceConfig;

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Enricher backed by the Gemini `generateContent` endpoint.
///
/// Each story costs up to four calls. A failed call falls back to data already
/// on the story, so `enrich` never returns an error.
pub struct GeminiEnricher {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model_name: String,
    min_quality_score: u8,
    limiter: RateLimiter,
}

impl GeminiEnricher {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Inference("Gemini API key is required".to_string()))?;

        Ok(Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
            min_quality_score: config.min_quality_score,
            limiter: RateLimiter::per_minute(
                config.requests_per_minute,
                Duration::from_millis(config.request_spacing_ms),
            ),
        })
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        self.limiter.acquire().await;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model_name))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;

        response
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| Error::Inference("Gemini returned no text".to_string()))
    }

    async fn evaluate(&self, story: &StoryGroup) -> QualityVerdict {
        match self.generate(quality_prompt(story)).await {
            Ok(reply) => {
                let verdict = parse_quality(&reply);
                debug!("Quality {} for {}: {}", verdict.score, story.title, verdict.reason);
                verdict
            }
            Err(e) => {
                warn!("⚠️ Quality evaluation failed for {}: {}", story.title, e);
                QualityVerdict::fallback("Evaluation error")
            }
        }
    }

    async fn detect_category(&self, story: &StoryGroup) -> Category {
        match self.generate(category_prompt(story)).await {
            Ok(reply) => parse_category(&reply).unwrap_or(story.category),
            Err(e) => {
                warn!("⚠️ Category detection failed for {}: {}", story.title, e);
                story.category
            }
        }
    }

    async fn summarize(&self, story: &StoryGroup, category: Category) -> SummaryDraft {
        let fallback = fallback_summary(story);
        match self.generate(summary_prompt(story, category)).await {
            Ok(reply) => parse_summary(&reply, &fallback),
            Err(e) => {
                warn!("⚠️ Summary failed for {}: {}", story.title, e);
                SummaryDraft {
                    summary: fallback,
                    image_prompt: None,
                }
            }
        }
    }

    async fn daily_impact(&self, story: &StoryGroup, category: Category, summary: &str) -> Option<String> {
        match self.generate(impact_prompt(story, category, summary)).await {
            Ok(reply) => parse_impact(&reply),
            Err(e) => {
                warn!("⚠️ Impact analysis failed for {}: {}", story.title, e);
                None
            }
        }
    }
}

fn fallback_summary(story: &StoryGroup) -> String {
    [&story.description, &story.combined_description, &story.title]
        .into_iter()
        .find(|text| !text.trim().is_empty())
        .cloned()
        .unwrap_or_default()
}

impl fmt::Debug for GeminiEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiEnricher")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[async_trait]
impl Enricher for GeminiEnricher {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn enrich(&self, story: &StoryGroup) -> Result<Enrichment> {
        let verdict = self.evaluate(story).await;
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
            info!("❌ Skipping low-quality story (score {}): {}", verdict.score, story.title);
            return Ok(enrichment);
        }

        let category = self.detect_category(story).await;
        let draft = self.summarize(story, category).await;

        if wants_impact(enrichment.quality_score, category) {
            enrichment.daily_life_impact = self.daily_impact(story, category, &draft.summary).await;
        }

        enrichment.image_keywords = Some(
            draft
                .image_prompt
                .unwrap_or_else(|| image_keywords(&story.title, category)),
        );
        enrichment.category = category;
        enrichment.summary = Some(draft.summary);
        enrichment.should_publish = true;

        info!("✅ Enriched story: {}", story.title);
        Ok(enrichment)
    }
}
