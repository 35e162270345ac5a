//! `reqwest`-backed transport.

use super::{Fetch, Request, Response};
use crate::config::HttpSettings;
use crate::error::FetchError;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// Raw transport: one attempt per call, no pacing, no retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client with the configured timeout, redirect policy and the
    /// browser-identifying user agent header.
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        let redirect = if settings.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .timeout(settings.timeout())
            .redirect(redirect)
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(HttpTransport { client })
    }
}

impl Fetch for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: Request) -> Result<Response, FetchError> {
        let url = Url::parse(&request.url).map_err(|source| FetchError::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let transport_error = |e: reqwest::Error| FetchError::Transport {
            url: request.url.clone(),
            source: Box::new(e),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(transport_error)?;
        debug!(status = status.as_u16(), bytes = body.len(), "Fetched");

        Ok(Response {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_default_settings() {
        assert!(HttpTransport::new(&HttpSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_sent() {
        let transport = HttpTransport::new(&HttpSettings::default()).unwrap();
        let err = transport.get("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert!(!err.is_retryable());
    }
}
