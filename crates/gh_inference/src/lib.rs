use std::fmt;

use serde::{Deserialize, Serialize};

pub mod models;
pub mod prompts;
pub mod rate_limit;

pub use models::{create_enricher, GeminiEnricher, HeuristicEnricher, ModelKind};

pub const MIN_QUALITY_SCORE: u8 = 3;
pub const SUMMARY_MAX_CHARS: usize = 300;
pub const IMPACT_MAX_CHARS: usize = 200;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InferenceConfig {
    pub model: ModelKind,
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
    /// Stories scoring below this are stored as processed but never published.
    pub min_quality_score: u8,
    pub requests_per_minute: u32,
    pub request_spacing_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Heuristic,
            api_key: None,
            model_name: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            min_quality_score: MIN_QUALITY_SCORE,
            requests_per_minute: 15,
            request_spacing_ms: 4000,
        }
    }
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("min_quality_score", &self.min_quality_score)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("request_spacing_ms", &self.request_spacing_ms)
            .finish()
    }
}

pub mod prelude {
    pub use super::models::create_enricher;
    pub use super::InferenceConfig;
    pub use gh_core::{Enricher, Enrichment, Error, Result, StoryGroup};
}
