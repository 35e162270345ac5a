//! Settings file and origin registry.
//!
//! The pipeline reads a single YAML document:
//!
//! ```yaml
//! store_path: announcements.json
//! webhook_url: https://hooks.example.com/announcements   # optional
//! http:
//!   interval_ms: 1000
//!   timeout_secs: 10
//!   max_retries: 3
//!   retry_base_delay_ms: 1000
//! origins:
//!   - id: 1
//!     code: FA1
//!     name: General notices
//!     listing_url: https://www.example.ac.kr/notice/list.do?list_id=FA1
//!     adapter: COMMON
//!     poll_interval_minutes: 30
//!     board: general
//! ```
//!
//! Every `http` key is optional; see [`HttpSettings`] for defaults.

use crate::models::Origin;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

/// Browser-identifying header; upstream boards block obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("origin code {0:?} is registered twice")]
    DuplicateOrigin(String),

    #[error("no origin with code or id {0:?}")]
    UnknownOrigin(String),

    #[error("origin {code:?}: {reason}")]
    Invalid { code: String, reason: String },
}

/// Outbound HTTP behaviour shared by every origin's access client.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpSettings {
    /// Minimum spacing between two requests to one origin.
    pub interval_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub follow_redirects: bool,
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_base_delay_ms: u64,
    /// Optional ceiling for a single backoff delay. Unbounded when absent.
    pub retry_max_delay_ms: Option<u64>,
    /// Upper bound of random jitter added to each backoff delay. Zero disables it.
    pub retry_jitter_ms: u64,
    /// Base that relative request paths are resolved against.
    pub base_url: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            interval_ms: 1000,
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: None,
            retry_jitter_ms: 0,
            base_url: None,
        }
    }
}

impl HttpSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub origins: Vec<Origin>,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("announcements.json")
}

impl Settings {
    /// Parse and validate a settings document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_yaml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let settings = Self::from_yaml(&text)?;
        info!(origins = settings.origins.len(), "Loaded settings");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for origin in &self.origins {
            if !seen.insert(origin.code.as_str()) {
                return Err(ConfigError::DuplicateOrigin(origin.code.clone()));
            }
            if origin.poll_interval_minutes == 0 {
                return Err(ConfigError::Invalid {
                    code: origin.code.clone(),
                    reason: "poll_interval_minutes must be positive".to_string(),
                });
            }
            if let Err(e) = Url::parse(&origin.listing_url) {
                return Err(ConfigError::Invalid {
                    code: origin.code.clone(),
                    reason: format!("listing_url: {}", e),
                });
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> Registry {
        Registry {
            origins: self.origins.clone(),
        }
    }
}

/// Read-only view of the registered origins.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    origins: Vec<Origin>,
}

impl Registry {
    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    /// Look an origin up by its code or its numeric id.
    pub fn find(&self, key: &str) -> Result<&Origin, ConfigError> {
        let by_id = key.parse::<u32>().ok();
        self.origins
            .iter()
            .find(|o| o.code == key || Some(o.id) == by_id)
            .ok_or_else(|| ConfigError::UnknownOrigin(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdapterKind;

    const SAMPLE: &str = r#"
store_path: /tmp/announcements.json
http:
  interval_ms: 250
  max_retries: 5
origins:
  - id: 1
    code: FA1
    name: General notices
    listing_url: https://www.example.ac.kr/notice/list.do?list_id=FA1
    adapter: COMMON
    poll_interval_minutes: 30
    board: general
  - id: 7
    code: SCH
    name: Scholarships
    listing_url: https://scholarship.example.ac.kr/notice/list.do?brdBbsseq=1
    adapter: SCHOLAR
    poll_interval_minutes: 60
    board: scholarship
    major: finance
"#;

    #[test]
    fn test_parse_sample_settings() {
        let settings = Settings::from_yaml(SAMPLE).unwrap();
        assert_eq!(settings.http.interval_ms, 250);
        assert_eq!(settings.http.max_retries, 5);
        assert_eq!(settings.http.timeout_secs, 10);
        assert_eq!(settings.http.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.http.retry_max_delay_ms, None);
        assert_eq!(settings.store_path, PathBuf::from("/tmp/announcements.json"));
        assert_eq!(settings.origins.len(), 2);
        assert_eq!(settings.origins[1].adapter, AdapterKind::Scholar);
        assert_eq!(settings.origins[1].major.as_deref(), Some("finance"));
    }

    #[test]
    fn test_registry_lookup_by_code_and_id() {
        let registry = Settings::from_yaml(SAMPLE).unwrap().registry();
        assert_eq!(registry.find("SCH").unwrap().id, 7);
        assert_eq!(registry.find("1").unwrap().code, "FA1");
        assert!(matches!(
            registry.find("nope"),
            Err(ConfigError::UnknownOrigin(_))
        ));
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let doc = r#"
origins:
  - { id: 1, code: A, name: a, listing_url: "https://a.example/list.do", poll_interval_minutes: 5, board: a }
  - { id: 2, code: A, name: b, listing_url: "https://b.example/list.do", poll_interval_minutes: 5, board: b }
"#;
        assert!(matches!(
            Settings::from_yaml(doc),
            Err(ConfigError::DuplicateOrigin(code)) if code == "A"
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let doc = r#"
origins:
  - { id: 1, code: A, name: a, listing_url: "https://a.example/list.do", poll_interval_minutes: 0, board: a }
"#;
        assert!(matches!(
            Settings::from_yaml(doc),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let settings = Settings::from_yaml("origins: []").unwrap();
        assert_eq!(settings.http, HttpSettings::default());
        assert_eq!(settings.store_path, PathBuf::from("announcements.json"));
        assert!(settings.webhook_url.is_none());
    }
}
