use std::sync::Once;

use tracing::Level;

static INIT: Once = Once::new();

/// Prefixes every line with the feed it concerns.
#[derive(Debug, Clone)]
pub struct FeedLogger {
    prefix: String,
}

impl FeedLogger {
    pub fn for_source(name: &str) -> Self {
        Self {
            prefix: format!("[{}]", name),
        }
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{} {}", self.prefix, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{} {}", self.prefix, message);
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!("{} {}", self.prefix, message);
    }
}

/// Installs the global fmt subscriber once, writing to stderr; later calls
/// are no-ops.
pub fn init_logging(verbose: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    });
}
