//! Per-source circuit breaker for feeds that keep failing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gh_core::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_RESET_AFTER_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitRecord {
    pub state: CircuitState,
    pub failures: u32,
    pub last_failure: Option<DateTime<Utc>>,
}

/// Where breaker state lives between runs.
#[async_trait]
pub trait CircuitStateStore: Send + Sync {
    async fn get(&self, source: &str) -> Result<Option<CircuitRecord>>;
    async fn set(&self, source: &str, record: CircuitRecord) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCircuitStore {
    records: RwLock<HashMap<String, CircuitRecord>>,
}

impl MemoryCircuitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CircuitStateStore for MemoryCircuitStore {
    async fn get(&self, source: &str) -> Result<Option<CircuitRecord>> {
        Ok(self.records.read().await.get(source).cloned())
    }

    async fn set(&self, source: &str, record: CircuitRecord) -> Result<()> {
        self.records.write().await.insert(source.to_string(), record);
        Ok(())
    }
}

/// Skips sources after repeated failures and retries them once the reset
/// period has passed.
///
/// Store errors never block a fetch: they are logged and the source is
/// treated as closed.
#[derive(Clone)]
pub struct CircuitBreaker {
    store: Arc<dyn CircuitStateStore>,
    failure_threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    pub fn new(store: Arc<dyn CircuitStateStore>) -> Self {
        Self {
            store,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_after: Duration::seconds(DEFAULT_RESET_AFTER_SECS),
        }
    }

    pub fn with_policy(mut self, failure_threshold: u32, reset_after: Duration) -> Self {
        self.failure_threshold = failure_threshold.max(1);
        self.reset_after = reset_after;
        self
    }

    pub async fn state(&self, source: &str) -> CircuitState {
        self.load(source).await.state
    }

    /// Whether `source` should be skipped at `now`. An open circuit whose reset
    /// period has elapsed moves to half-open and lets the fetch through.
    pub async fn should_skip(&self, source: &str, now: DateTime<Utc>) -> bool {
        let record = self.load(source).await;
        if record.state != CircuitState::Open {
            return false;
        }

        let elapsed = record.last_failure.map(|at| now - at).unwrap_or(self.reset_after);
        if elapsed >= self.reset_after {
            info!("🔌 Circuit half-open for {}", source);
            self.save(
                source,
                CircuitRecord {
                    state: CircuitState::HalfOpen,
                    failures: 0,
                    last_failure: record.last_failure,
                },
            )
            .await;
            return false;
        }

        info!("⛔ Circuit open, skipping {}", source);
        true
    }

    pub async fn record_failure(&self, source: &str, now: DateTime<Utc>) {
        let mut record = self.load(source).await;
        record.failures += 1;
        record.last_failure = Some(now);

        if record.state == CircuitState::HalfOpen || record.failures >= self.failure_threshold {
            if record.state != CircuitState::Open {
                warn!("⛔ Circuit opened for {} after {} failures", source, record.failures);
            }
            record.state = CircuitState::Open;
        }
        self.save(source, record).await;
    }

    pub async fn record_success(&self, source: &str) {
        let record = self.load(source).await;
        if record.state == CircuitState::Closed && record.failures == 0 {
            return;
        }
        if record.state == CircuitState::HalfOpen {
            info!("✅ Circuit closed for {}", source);
        }
        self.save(source, CircuitRecord::default()).await;
    }

    async fn load(&self, source: &str) -> CircuitRecord {
        match self.store.get(source).await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!("⚠️ Could not read circuit state for {}: {}", source, e);
                CircuitRecord::default()
            }
        }
    }

    async fn save(&self, source: &str, record: CircuitRecord) {
        if let Err(e) = self.store.set(source, record).await {
            warn!("⚠️ Could not store circuit state for {}: {}", source, e);
        }
    }
}
