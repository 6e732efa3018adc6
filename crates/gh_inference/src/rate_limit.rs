use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::info;

struct Window {
    started: Instant,
    count: u32,
    last: Option<Instant>,
}

/// Caps requests per rolling minute and spaces consecutive requests apart.
///
/// Callers queue on the internal lock, so requests are released one at a time.
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    spacing: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration, spacing: Duration) -> Self {
        Self {
            max_per_window: max_per_window.max(1),
            window,
            spacing,
            state: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
                last: None,
            }),
        }
    }

    pub fn per_minute(max: u32, spacing: Duration) -> Self {
        Self::new(max, Duration::from_secs(60), spacing)
    }

    /// Waits until another request may be sent.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        if state.started.elapsed() >= self.window {
            state.started = Instant::now();
            state.count = 0;
        }

        if state.count >= self.max_per_window {
            let wait = self.window.saturating_sub(state.started.elapsed());
            info!("⏳ Rate limit reached, waiting {:?}", wait);
            sleep(wait).await;
            state.started = Instant::now();
            state.count = 0;
        }

        if let Some(last) = state.last {
            let since = last.elapsed();
            if since < self.spacing {
                sleep(self.spacing - since).await;
            }
        }

        state.count += 1;
        state.last = Some(Instant::now());
    }
}
