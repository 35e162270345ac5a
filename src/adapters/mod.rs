//! Site adapters turning board markup into structured records.
//!
//! Each adapter follows the same two-phase pattern:
//!
//! 1. **Listing**: Parse one listing page into [`ListingRecord`]s, skipping pinned notices
//! 2. **Detail**: Parse one detail page into [`DetailContent`] with a sanitized body
//!
//! # Supported Layouts
//!
//! | Kind | Module | Listing rows | Notes |
//! |------|--------|--------------|-------|
//! | `COMMON` | [`common`] | `ul.brd-lstp1 li` | Default for unknown kinds; collects hashtags |
//! | `SCHOLAR` | [`scholar`] | `form table tbody tr` | Date token lives in the view link |
//!
//! Rows that do not have the expected structure fail the whole page. A
//! board redesign should stop the pass rather than silently lose postings.

pub mod common;
pub mod sanitize;
pub mod scholar;

pub use common::CommonAdapter;
pub use scholar::ScholarAdapter;

use crate::error::ParseError;
use crate::models::{AdapterKind, DetailContent, ListingRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

/// Text in a row's number column that marks a pinned notice.
pub const NOTICE_MARKER: &str = "공지";

/// `fnView('<first>', '<second>')` inside a `javascript:` link target.
static VIEW_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"fnView\('([^']*)',\s*'([^']*)'\)").expect("valid view link pattern"));

/// Parsing capability shared by every board layout.
pub trait SiteAdapter {
    /// Parse a listing page. `base_url` is the origin's listing URL.
    fn parse_listing(&self, markup: &str, base_url: &str) -> Result<Vec<ListingRecord>, ParseError>;

    fn parse_detail(&self, markup: &str) -> Result<DetailContent, ParseError>;
}

/// Adapter selected by an origin's [`AdapterKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Common(CommonAdapter),
    Scholar(ScholarAdapter),
}

impl Adapter {
    /// Unrecognized kinds fall back to the common layout.
    pub fn for_kind(kind: AdapterKind) -> Self {
        match kind {
            AdapterKind::Scholar => Adapter::Scholar(ScholarAdapter),
            AdapterKind::Common | AdapterKind::Unknown => Adapter::Common(CommonAdapter),
        }
    }
}

impl SiteAdapter for Adapter {
    fn parse_listing(&self, markup: &str, base_url: &str) -> Result<Vec<ListingRecord>, ParseError> {
        match self {
            Adapter::Common(a) => a.parse_listing(markup, base_url),
            Adapter::Scholar(a) => a.parse_listing(markup, base_url),
        }
    }

    fn parse_detail(&self, markup: &str) -> Result<DetailContent, ParseError> {
        match self {
            Adapter::Common(a) => a.parse_detail(markup),
            Adapter::Scholar(a) => a.parse_detail(markup),
        }
    }
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Both arguments of the view handler referenced by `href`.
pub(crate) fn view_reference(href: &str) -> Result<(String, String), ParseError> {
    let caps = VIEW_LINK
        .captures(href)
        .ok_or_else(|| ParseError::MalformedLink {
            href: href.to_string(),
        })?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

/// All text below `element`, trimmed.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match of `selector` below `root`.
pub(crate) fn required_text(
    root: ElementRef<'_>,
    selector: &Selector,
    what: &'static str,
) -> Result<String, ParseError> {
    root.select(selector)
        .next()
        .map(text_of)
        .ok_or(ParseError::MissingElement { what })
}

pub(crate) fn parse_count(raw: &str) -> Result<u64, ParseError> {
    raw.replace(',', "")
        .parse::<u64>()
        .map_err(|source| ParseError::BadCount {
            raw: raw.to_string(),
            source,
        })
}
