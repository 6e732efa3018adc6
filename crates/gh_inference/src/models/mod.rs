use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use gh_core::{Enricher, Error, Result};
use serde::{Deserialize, Serialize};

use crate::InferenceConfig;

pub mod gemini;
pub mod heuristic;

pub use gemini::GeminiEnricher;
pub use heuristic::HeuristicEnricher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Heuristic,
    Gemini,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Heuristic => f.write_str("heuristic"),
            ModelKind::Gemini => f.write_str("gemini"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(ModelKind::Heuristic),
            "gemini" => Ok(ModelKind::Gemini),
            other => Err(Error::Validation(format!("unknown model: {}", other))),
        }
    }
}

pub fn create_enricher(config: &InferenceConfig) -> Result<Arc<dyn Enricher>> {
    match config.model {
        ModelKind::Heuristic => Ok(Arc::new(HeuristicEnricher::new(config.min_quality_score))),
        ModelKind::Gemini => Ok(Arc::new(GeminiEnricher::new(config)?)),
    }
}
