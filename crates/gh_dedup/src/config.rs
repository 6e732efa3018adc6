use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{DedupError, Result};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_NEAR_DUPLICATE_THRESHOLD: f64 = 0.98;
pub const DEFAULT_TIME_WINDOW_HOURS: i64 = 12;
pub const DEFAULT_BUCKET_KEYWORDS: usize = 3;

/// Tuning knobs for [`crate::Deduplicator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Minimum anchor/candidate title similarity for a merge (inclusive).
    pub similarity_threshold: f64,
    /// Titles at least this similar to an earlier one are dropped before grouping.
    pub near_duplicate_threshold: f64,
    /// Candidates must be published strictly less than this many hours from the anchor.
    pub time_window_hours: i64,
    /// Number of keywords forming the bucket key.
    pub bucket_keywords: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            near_duplicate_threshold: DEFAULT_NEAR_DUPLICATE_THRESHOLD,
            time_window_hours: DEFAULT_TIME_WINDOW_HOURS,
            bucket_keywords: DEFAULT_BUCKET_KEYWORDS,
        }
    }
}

impl DedupConfig {
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_time_window_hours(mut self, hours: i64) -> Self {
        self.time_window_hours = hours;
        self
    }

    /// The merge window, or `None` when the hour count overflows a `Duration`.
    pub fn time_window(&self) -> Option<Duration> {
        Duration::try_hours(self.time_window_hours)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("near_duplicate_threshold", self.near_duplicate_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DedupError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.time_window_hours <= 0 {
            return Err(DedupError::InvalidConfig(format!(
                "time_window_hours must be positive, got {}",
                self.time_window_hours
            )));
        }
        if self.time_window().is_none() {
            return Err(DedupError::InvalidConfig(format!(
                "time_window_hours is out of range, got {}",
                self.time_window_hours
            )));
        }
        if self.bucket_keywords == 0 {
            return Err(DedupError::InvalidConfig(
                "bucket_keywords must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
