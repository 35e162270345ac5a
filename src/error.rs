//! Error taxonomy for the scrape pipeline.
//!
//! - [`FetchError`]: transport failures and non-2xx responses (retryable)
//! - [`ParseError`]: markup that does not match the adapter's expectations (fatal)
//! - [`StoreError`]: persistence failures (fatal)
//! - [`ScrapeError`]: what a pass reports to its caller
//!
//! Duplicate scraping keys are deliberately absent: the store reports them as
//! commit conflicts and the controller treats them as skips.

use chrono::NaiveDate;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl FetchError {
    /// Transport and status failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport { .. } | FetchError::Status { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::InvalidUrl { url, .. } => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing {what}")]
    MissingElement { what: &'static str },

    #[error("link target {href:?} has no view reference")]
    MalformedLink { href: String },

    #[error("unparseable date {raw:?}: {source}")]
    BadDate {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unparseable view count {raw:?}: {source}")]
    BadCount {
        raw: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("cannot derive detail URL from {base:?}: {source}")]
    BadBaseUrl {
        base: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to parse {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

impl ScrapeError {
    pub fn parse(url: impl Into<String>, source: ParseError) -> Self {
        ScrapeError::Parse {
            url: url.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let status = FetchError::Status {
            url: "https://example.com".to_string(),
            status: 503,
        };
        assert!(status.is_retryable());

        let transport = FetchError::Transport {
            url: "https://example.com".to_string(),
            source: Box::new(std::io::Error::other("connection reset")),
        };
        assert!(transport.is_retryable());

        let invalid = FetchError::InvalidUrl {
            url: "::".to_string(),
            source: url::Url::parse("::").unwrap_err(),
        };
        assert!(!invalid.is_retryable());
        assert_eq!(invalid.url(), "::");
    }

    #[test]
    fn test_parse_error_carries_url() {
        let err = ScrapeError::parse(
            "https://example.com/list",
            ParseError::MissingElement { what: "row link" },
        );
        assert_eq!(
            err.to_string(),
            "failed to parse https://example.com/list: missing row link"
        );
    }
}
