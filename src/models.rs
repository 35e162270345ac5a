//! Data models for origins, scraped records and persisted announcements.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Origin`]: A registered announcement board and how to scrape it
//! - [`ListingRecord`]: One entry parsed from a listing page
//! - [`DetailContent`]: The parsed body of a detail page
//! - [`Announcement`] / [`AnnouncementDetail`]: What ends up in the store
//!
//! Listing and detail records only live for the duration of one pass; the
//! controller folds them into a [`NewAnnouncement`] which the store turns
//! into an [`Announcement`] on commit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which parser family an origin's markup belongs to.
///
/// Unknown values in the configuration deserialize to [`AdapterKind::Unknown`]
/// and are scraped with the common adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdapterKind {
    #[default]
    Common,
    Scholar,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::Common => "COMMON",
            AdapterKind::Scholar => "SCHOLAR",
            AdapterKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A registered external board the pipeline polls.
///
/// Origins are managed outside the pipeline (here: the YAML settings file)
/// and are read-only while scraping.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Origin {
    /// Numeric identifier, usable for on-demand triggers.
    pub id: u32,
    /// Unique code; prefix of every scraping key produced for this origin.
    pub code: String,
    /// Human readable board name.
    pub name: String,
    /// Listing page URL. The page index is appended as a query parameter.
    pub listing_url: String,
    /// Parser family for this board's markup.
    #[serde(default)]
    pub adapter: AdapterKind,
    /// Minutes between scheduled passes.
    pub poll_interval_minutes: u64,
    /// Board label copied onto every announcement.
    pub board: String,
    /// Optional major/category tag copied onto every announcement.
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub last_scraped_at: Option<DateTime<Utc>>,
}

impl Origin {
    /// The deterministic de-duplication key for a record of this origin.
    pub fn scraping_key(&self, native_id: &str) -> String {
        scraping_key(&self.code, native_id)
    }
}

/// Compose `"{code}-{native_id}"`.
pub fn scraping_key(code: &str, native_id: &str) -> String {
    format!("{}-{}", code, native_id)
}

/// One non-notice row of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    /// Site-native identifier string.
    pub id: String,
    /// Absolute URL of the record's detail page.
    pub url: String,
    pub date: NaiveDate,
    pub view_count: u64,
}

/// Parsed content of a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailContent {
    pub title: String,
    pub author: String,
    /// Sanitized inner markup of the body container.
    pub html: String,
    /// Hashtags, when the page carries a hashtag box.
    pub tags: Option<Vec<String>>,
}

/// A record staged for insertion; becomes an [`Announcement`] on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnouncement {
    pub scraping_key: String,
    pub title: String,
    pub author: String,
    pub board: String,
    pub written_at: NaiveDate,
    pub view_count: u64,
    pub target_url: String,
    pub major: Option<String>,
    pub tags: Option<Vec<String>>,
    pub detail: AnnouncementDetail,
}

impl NewAnnouncement {
    /// Fold a listing row and its parsed detail page into a staged record.
    pub fn build(origin: &Origin, record: &ListingRecord, content: DetailContent) -> Self {
        NewAnnouncement {
            scraping_key: origin.scraping_key(&record.id),
            title: content.title,
            author: content.author,
            board: origin.board.clone(),
            written_at: record.date,
            view_count: record.view_count,
            target_url: origin.listing_url.clone(),
            major: origin.major.clone(),
            tags: content.tags,
            detail: AnnouncementDetail {
                url: record.url.clone(),
                html: content.html,
            },
        }
    }
}

/// Source URL and sanitized markup of one announcement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnnouncementDetail {
    pub url: String,
    pub html: String,
}

/// A persisted announcement. Created once, never updated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Announcement {
    pub id: u64,
    pub scraping_key: String,
    pub title: String,
    pub author: String,
    pub board: String,
    pub written_at: NaiveDate,
    pub view_count: u64,
    pub target_url: String,
    pub major: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub detail: AnnouncementDetail,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Announcement {
    /// Materialize a staged record with its assigned id and commit time.
    pub fn from_new(id: u64, new: NewAnnouncement, now: DateTime<Utc>) -> Self {
        Announcement {
            id,
            scraping_key: new.scraping_key,
            title: new.title,
            author: new.author,
            board: new.board,
            written_at: new.written_at,
            view_count: new.view_count,
            target_url: new.target_url,
            major: new.major,
            tags: new.tags,
            detail: new.detail,
            created_at: now,
            modified_at: now,
        }
    }
}
