//! Adapter for the scholarship board layout.
//!
//! Listing rows are plain table rows:
//!
//! ```text
//! <td>512</td>
//! <td><a href="javascript:fnView('20250304', '512');">Title</a></td>
//! <td>Author</td><td>2025-03-04</td><td>88</td>
//! ```
//!
//! The first `fnView` argument is the posting date (`YYYYMMDD`), the second
//! the board sequence. The row's display number is the native identifier.

use super::sanitize::clean_inner_html;
use super::{
    NOTICE_MARKER, SiteAdapter, parse_count, required_text, selector, view_reference,
};
use crate::error::ParseError;
use crate::models::{DetailContent, ListingRecord};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

static ROWS: Lazy<Selector> = Lazy::new(|| selector("div#subConWarp form table tbody tr"));
static NUMBER: Lazy<Selector> = Lazy::new(|| selector("td:nth-child(1)"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("td a"));
static VIEWS: Lazy<Selector> = Lazy::new(|| selector("td:nth-child(5)"));

static TITLE: Lazy<Selector> =
    Lazy::new(|| selector("#subConWarp > table > thead > tr > td.left_L.fontBold"));
static AUTHOR: Lazy<Selector> =
    Lazy::new(|| selector("#subConWarp > table > tbody > tr:nth-child(1) > td:nth-child(2)"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("#td_content"));

/// Board id used when the listing URL does not name one.
const DEFAULT_BOARD_SEQ: &str = "1";

/// Parser for the scholarship board.
///
/// Unlike [`super::CommonAdapter`], the listing's date is only available as
/// the first `fnView` argument and the detail URL is rebuilt from scratch:
///
/// ```text
/// list.do?brdBbsseq=3  +  fnView('20250304', '512')
///   -> view.do?brdDate=20250304&brdSeq=512&brdBbsseq=3&identified=anonymous
/// ```
///
/// The board id is copied from the listing URL's `brdBbsseq`; when absent,
/// `1` is used. Detail pages carry no hashtags, so `tags` is always `None`.
///
/// # Examples
///
/// ```ignore
/// let records = ScholarAdapter.parse_listing(&markup, "https://s.example/notice/list.do?brdBbsseq=3")?;
/// let content = ScholarAdapter.parse_detail(&detail_markup)?;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScholarAdapter;

impl ScholarAdapter {
    fn detail_url(base_url: &str, date_token: &str, seq: &str) -> Result<String, ParseError> {
        let bad_base = |source: url::ParseError| ParseError::BadBaseUrl {
            base: base_url.to_string(),
            source,
        };
        let listing = Url::parse(base_url).map_err(bad_base)?;
        let board_seq = match listing.query_pairs().find(|(k, _)| k == "brdBbsseq") {
            Some((_, v)) => v.into_owned(),
            None => {
                debug!(
                    base = base_url,
                    board_seq = DEFAULT_BOARD_SEQ,
                    "Listing URL has no brdBbsseq; using default board id"
                );
                DEFAULT_BOARD_SEQ.to_string()
            }
        };

        let mut url = Url::parse(&base_url.replace("list.do", "view.do")).map_err(bad_base)?;
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("brdDate", date_token)
            .append_pair("brdSeq", seq)
            .append_pair("brdBbsseq", &board_seq)
            .append_pair("identified", "anonymous");
        Ok(url.to_string())
    }
}

impl SiteAdapter for ScholarAdapter {
    fn parse_listing(&self, markup: &str, base_url: &str) -> Result<Vec<ListingRecord>, ParseError> {
        let document = Html::parse_document(markup);
        let rows: Vec<_> = document.select(&ROWS).collect();
        debug!(rows = rows.len(), "Found listing rows");

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let number = required_text(row, &NUMBER, "row number")?;
            if number.contains(NOTICE_MARKER) {
                continue;
            }

            let href = row
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .ok_or(ParseError::MissingElement { what: "title link" })?;
            let (date_token, seq) = view_reference(href)?;

            let date = NaiveDate::parse_from_str(&date_token, "%Y%m%d").map_err(|source| {
                ParseError::BadDate {
                    raw: date_token.clone(),
                    source,
                }
            })?;
            let raw_views = required_text(row, &VIEWS, "view count column")?;

            records.push(ListingRecord {
                url: Self::detail_url(base_url, &date_token, &seq)?,
                id: number,
                date,
                view_count: parse_count(&raw_views)?,
            });
        }

        Ok(records)
    }

    fn parse_detail(&self, markup: &str) -> Result<DetailContent, ParseError> {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let title = required_text(root, &TITLE, "title")?;
        let author = required_text(root, &AUTHOR, "author")?;
        let body = root
            .select(&BODY)
            .next()
            .ok_or(ParseError::MissingElement { what: "body" })?;

        Ok(DetailContent {
            title,
            author,
            html: clean_inner_html(body),
            tags: None,
        })
    }
}
