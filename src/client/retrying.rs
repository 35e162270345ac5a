//! Retry decorator with exponential backoff.
//!
//! # Backoff Strategy
//!
//! The delay before retry `k` (0-indexed) follows:
//! ```text
//! delay = min(base_delay * 2^k, max_delay) + random_jitter(0..=jitter)
//! ```
//! With the default settings there is no cap and no jitter, so persistent
//! failure produces the sequence `d, 2d, 4d, ...`.

use super::{Fetch, Request, Response};
use crate::config::HttpSettings;
use crate::error::FetchError;
use rand::{Rng, rng};
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{error, instrument, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Option<Duration>,
    pub jitter: Duration,
}

impl Backoff {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Backoff {
            max_retries,
            base_delay,
            max_delay: None,
            jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay before retry `k`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let delay = self.base_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) if delay > cap => cap,
            _ => delay,
        }
    }

    fn jittered(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        if self.jitter.is_zero() {
            return delay;
        }
        let max_ms = self.jitter.as_millis() as u64;
        let jitter_ms: u64 = rng().random_range(0..=max_ms);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl From<&HttpSettings> for Backoff {
    fn from(settings: &HttpSettings) -> Self {
        Backoff {
            max_delay: settings.retry_max_delay_ms.map(Duration::from_millis),
            jitter: Duration::from_millis(settings.retry_jitter_ms),
            ..Backoff::new(
                settings.max_retries,
                Duration::from_millis(settings.retry_base_delay_ms),
            )
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`] implementation.
///
/// Transport failures and non-2xx statuses are retried; anything else (an
/// unparseable URL, for instance) is returned immediately. Retry state is
/// local to each call.
pub struct Retrying<T> {
    inner: T,
    backoff: Backoff,
    base_url: Option<String>,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, backoff: Backoff) -> Self {
        Retrying {
            inner,
            backoff,
            base_url: None,
        }
    }

    /// Resolve relative request paths against `base`.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    fn resolve(&self, url: &str) -> String {
        if Url::parse(url).is_ok() {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }
}

impl<T> fmt::Debug for Retrying<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("backoff", &self.backoff)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl<T: Fetch> Fetch for Retrying<T> {
    #[instrument(level = "debug", skip_all, fields(method = %request.method, url = %request.url))]
    async fn execute(&self, mut request: Request) -> Result<Response, FetchError> {
        request.url = self.resolve(&request.url);
        let total_t0 = Instant::now();
        let mut retry = 0u32;

        loop {
            match self.inner.execute(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if retry >= self.backoff.max_retries {
                        error!(
                            attempts = retry + 1,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            url = e.url(),
                            error = %e,
                            "Request failed after {} retries",
                            self.backoff.max_retries
                        );
                        return Err(e);
                    }

                    let delay = self.backoff.jittered(retry);
                    warn!(
                        attempt = retry + 1,
                        max = self.backoff.max_retries + 1,
                        ?delay,
                        error = %e,
                        "Request failed; backing off"
                    );
                    sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }
}
