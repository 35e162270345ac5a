//! Minimum-interval pacing of outbound requests.

use super::{Fetch, Request, Response};
use crate::error::FetchError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Serializes every call through one lock and keeps at least `interval`
/// between the completion of one request and the start of the next.
///
/// The marker is updated after failed attempts too, so an error still uses
/// up its slot. No retrying happens here; errors pass through unchanged.
#[derive(Debug)]
pub struct RateLimited<T> {
    inner: T,
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl<T> RateLimited<T> {
    pub fn new(inner: T, interval: Duration) -> Self {
        RateLimited {
            inner,
            interval,
            last_request: Mutex::new(None),
        }
    }
}

impl<T: Fetch> Fetch for RateLimited<T> {
    async fn execute(&self, request: Request) -> Result<Response, FetchError> {
        // Held across the request: callers sharing this client are totally ordered.
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, url = %request.url, "Rate limiting");
                sleep(wait).await;
            }
        }

        let result = self.inner.execute(request).await;
        *last = Some(Instant::now());
        result
    }
}
