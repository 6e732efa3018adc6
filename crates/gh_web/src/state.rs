use std::sync::Arc;

use gh_core::StoryStorage;
use gh_dedup::Deduplicator;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StoryStorage>,
    pub dedup: Deduplicator,
}

impl AppState {
    pub fn new(storage: Arc<dyn StoryStorage>, dedup: Deduplicator) -> Self {
        Self { storage, dedup }
    }
}
