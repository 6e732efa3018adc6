//! RSS ingestion: feed sources, parsing, circuit breaking and the run loop
//! that feeds grouped stories into storage and enrichment.

pub mod circuit;
pub mod logging;
pub mod manager;
pub mod parser;
pub mod reader;
pub mod sanitize;
pub mod sources;

pub use circuit::{CircuitBreaker, CircuitState, CircuitStateStore, MemoryCircuitStore};
pub use logging::init_logging;
pub use manager::{EnrichConfig, EnrichReport, IngestReport, IngestionManager};
pub use parser::parse_feed;
pub use reader::{IngestConfig, RssFeedReader};
pub use sources::{default_sources, is_valid_feed_url, load_sources, FeedSource, Priority};

pub mod prelude {
    pub use super::{FeedSource, IngestionManager, RssFeedReader};
    pub use gh_core::{RawArticle, Result};
}
