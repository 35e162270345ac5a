//! Outbound HTTP access for the scrape pipeline.
//!
//! The module uses a trait-based design so decorators can be stacked over a
//! raw transport:
//! - [`Fetch`]: Core trait defining an async request/response exchange
//! - [`HttpTransport`]: `reqwest` implementation with timeout, redirects and user agent
//! - [`Retrying`]: Decorator adding bounded exponential backoff
//! - [`RateLimited`]: Decorator enforcing a minimum spacing between requests
//!
//! Every origin gets its own [`AccessClient`]: rate limiting is outermost, so
//! one request (including all of its retries) occupies one rate-limited slot.

pub mod http;
pub mod rate_limited;
pub mod retrying;

pub use http::HttpTransport;
pub use rate_limited::RateLimited;
pub use retrying::{Backoff, Retrying};

use crate::config::HttpSettings;
use crate::error::FetchError;
use reqwest::Method;

/// An outbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// JSON body, sent with `Content-Type: application/json`.
    pub json: Option<serde_json::Value>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            json: None,
        }
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }
}

/// A successful (2xx) response with its decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Trait for async HTTP exchange.
///
/// Implementors return `Err(FetchError::Status)` for any non-2xx response, so
/// callers only ever see successful responses in `Ok`.
pub trait Fetch {
    async fn execute(&self, request: Request) -> Result<Response, FetchError>;

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        self.execute(Request::new(Method::GET, url)).await
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<Response, FetchError> {
        self.execute(Request::new(Method::POST, url).with_json(body))
            .await
    }

    // no pipeline step removes remote state yet; webhook receivers accept it
    #[allow(dead_code)]
    async fn delete(&self, url: &str) -> Result<Response, FetchError> {
        self.execute(Request::new(Method::DELETE, url)).await
    }
}

/// Per-origin client: rate limit first, then retry inside the slot.
pub type AccessClient<T = HttpTransport> = RateLimited<Retrying<T>>;

/// Compose the full access stack around a transport.
pub fn access_client<T: Fetch>(transport: T, settings: &HttpSettings) -> AccessClient<T> {
    RateLimited::new(retrying_client(transport, settings), settings.interval())
}

/// Retry-only stack, used for calls that are not subject to an origin's rate budget.
pub fn retrying_client<T: Fetch>(transport: T, settings: &HttpSettings) -> Retrying<T> {
    let client = Retrying::new(transport, Backoff::from(settings));
    match &settings.base_url {
        Some(base) => client.with_base_url(base.clone()),
        None => client,
    }
}
