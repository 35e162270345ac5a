//! Outbound notification of newly persisted announcements.
//!
//! Each committed announcement is POSTed on its own as
//! `{"article": {"origin": {...}, "contents": {...}}}`. The receiver predates
//! this crate, so `link` carries the title and `date` carries the author.

use crate::client::{Fetch, HttpTransport, Retrying};
use crate::models::{Announcement, Origin};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
pub struct ArticleOrigin<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub target_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ArticleContents<'a> {
    /// Scraping key of the announcement.
    pub id: &'a str,
    /// Title.
    pub link: &'a str,
    /// Author.
    pub date: &'a str,
    /// Sanitized body markup.
    pub body: &'a str,
    pub original_url: &'a str,
    pub written_at: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct Article<'a> {
    pub origin: ArticleOrigin<'a>,
    pub contents: ArticleContents<'a>,
}

#[derive(Debug, Serialize)]
pub struct ArticlePayload<'a> {
    pub article: Article<'a>,
}

impl<'a> ArticlePayload<'a> {
    pub fn new(origin: &'a Origin, announcement: &'a Announcement) -> Self {
        ArticlePayload {
            article: Article {
                origin: ArticleOrigin {
                    code: &origin.code,
                    name: &origin.name,
                    target_url: &origin.listing_url,
                },
                contents: ArticleContents {
                    id: &announcement.scraping_key,
                    link: &announcement.title,
                    date: &announcement.author,
                    body: &announcement.detail.html,
                    original_url: &announcement.detail.url,
                    written_at: announcement.written_at,
                },
            },
        }
    }
}

/// Delivers payloads to one endpoint through a retrying client.
#[derive(Debug)]
pub struct Webhook<T = HttpTransport> {
    client: Retrying<T>,
    url: String,
}

impl<T: Fetch> Webhook<T> {
    pub fn new(client: Retrying<T>, url: impl Into<String>) -> Self {
        Webhook {
            client,
            url: url.into(),
        }
    }

    /// POST every announcement; returns how many were accepted.
    ///
    /// Delivery failures are logged and swallowed, the rows are already
    /// committed by the time this runs.
    #[instrument(level = "info", skip_all, fields(origin = %origin.code, count = announcements.len()))]
    pub async fn notify(&self, origin: &Origin, announcements: &[Announcement]) -> usize {
        let mut delivered = 0;
        for announcement in announcements {
            let payload = match serde_json::to_value(ArticlePayload::new(origin, announcement)) {
                Ok(value) => value,
                Err(e) => {
                    error!(key = %announcement.scraping_key, error = %e, "Failed to encode webhook payload");
                    continue;
                }
            };
            match self.client.post_json(&self.url, payload).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    error!(key = %announcement.scraping_key, error = %e, "Webhook delivery failed");
                }
            }
        }
        info!(delivered, "Webhook notifications sent");
        delivered
    }
}
