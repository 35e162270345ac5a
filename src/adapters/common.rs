//! Adapter for the common board layout.
//!
//! # Listing Structure
//!
//! ```text
//! <ul class="brd-lstp1">
//!   <li>
//!     <p class="num">29974</p>            (or "공지" for pinned notices)
//!     <div class="ti"><a href="javascript:fnView('11', '29974');">Title</a></div>
//!     <div class="da"><span>Author</span> <span>2025.03.04</span> <span>120</span></div>
//!   </li>
//! </ul>
//! ```
//!
//! The second `fnView` argument is the posting sequence. Detail URLs are the
//! listing URL with `list.do` swapped for `view.do` plus a `seq` parameter.

use super::sanitize::clean_inner_html;
use super::{
    NOTICE_MARKER, SiteAdapter, parse_count, required_text, selector, text_of, view_reference,
};
use crate::error::ParseError;
use crate::models::{DetailContent, ListingRecord};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

static ROWS: Lazy<Selector> = Lazy::new(|| selector(".content-area #contents ul.brd-lstp1 li"));
static NUMBER: Lazy<Selector> = Lazy::new(|| selector("p.num"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| selector(".ti a"));
static META: Lazy<Selector> = Lazy::new(|| selector(".da"));
static SPAN: Lazy<Selector> = Lazy::new(|| selector("span"));

static TITLE: Lazy<Selector> =
    Lazy::new(|| selector("#contents > div > div.view-bx > div.vw-tibx > h4"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| {
    selector("#contents > div > div.view-bx > div.vw-tibx > div > div > span:nth-child(2)")
});
static HASHTAGS: Lazy<Selector> = Lazy::new(|| selector(".hashTag-bx a"));
static BODY: Lazy<Selector> = Lazy::new(|| selector(".vw-con"));

/// Parser for the common board layout, and the fallback for unknown kinds.
///
/// # Listing
///
/// Rows whose number column reads `공지` are dropped. For every other row:
/// - `id` is the second `fnView` argument
/// - `url` is the listing URL with `list.do` -> `view.do` and `seq=<id>` appended
/// - `date` and `view_count` come from the 2nd and 3rd spans of `.da`
///
/// # Detail
///
/// Title and author come from the `.vw-tibx` header, the body from `.vw-con`
/// (sanitized, see [`super::sanitize`]). Hashtag links become `tags`; a page
/// without a hashtag box yields `None`.
///
/// # Errors
///
/// Any row missing a link, date or view count fails the whole page with a
/// [`ParseError`].
///
/// # Examples
///
/// ```ignore
/// let records = CommonAdapter.parse_listing(&markup, "https://www.example.ac.kr/notice/list.do?list_id=FA1")?;
/// assert_eq!(records[0].url, "https://www.example.ac.kr/notice/view.do?list_id=FA1&seq=29974");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommonAdapter;

impl CommonAdapter {
    fn detail_url(base_url: &str, seq: &str) -> Result<String, ParseError> {
        let view = base_url.replace("list.do", "view.do");
        let mut url = Url::parse(&view).map_err(|source| ParseError::BadBaseUrl {
            base: base_url.to_string(),
            source,
        })?;
        url.query_pairs_mut().append_pair("seq", seq);
        Ok(url.to_string())
    }
}

impl SiteAdapter for CommonAdapter {
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
                .select(&TITLE_LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .ok_or(ParseError::MissingElement { what: "title link" })?;
            let (_, seq) = view_reference(href)?;

            // author, date, views
            let meta = row
                .select(&META)
                .next()
                .ok_or(ParseError::MissingElement { what: "meta fields" })?;
            let fields: Vec<String> = meta.select(&SPAN).map(text_of).collect();
            let raw_date = fields
                .get(1)
                .ok_or(ParseError::MissingElement { what: "date field" })?;
            let raw_views = fields
                .get(2)
                .ok_or(ParseError::MissingElement { what: "view count field" })?;

            let date = NaiveDate::parse_from_str(&raw_date.replace('.', "-"), "%Y-%m-%d")
                .map_err(|source| ParseError::BadDate {
                    raw: raw_date.clone(),
                    source,
                })?;

            records.push(ListingRecord {
                url: Self::detail_url(base_url, &seq)?,
                id: seq,
                date,
                view_count: parse_count(raw_views)?,
            });
        }

        Ok(records)
    }

    fn parse_detail(&self, markup: &str) -> Result<DetailContent, ParseError> {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let title = required_text(root, &TITLE, "title")?;
        let author = required_text(root, &AUTHOR, "author")?;

        let tags: Vec<String> = root.select(&HASHTAGS).map(text_of).collect();
        let tags = if tags.is_empty() { None } else { Some(tags) };

        let body = root
            .select(&BODY)
            .next()
            .ok_or(ParseError::MissingElement { what: "body" })?;

        Ok(DetailContent {
            title,
            author,
            html: clean_inner_html(body),
            tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Row, common_detail, common_listing};

    const BASE: &str = "https://www.example.ac.kr/notice/list.do?list_id=FA1";

    #[test]
    fn test_listing_skips_notices_and_keeps_order() {
        let markup = common_listing(&[
            Row::notice("900", "2025-03-01"),
            Row::new("105", "2025-03-04", 12),
            Row::notice("901", "2025-02-01"),
            Row::new("104", "2025-03-03", 7),
            Row::new("103", "2025-03-03", 1_204),
        ]);

        let records = CommonAdapter.parse_listing(&markup, BASE).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["105", "104", "103"]);

        let first = &records[0];
        assert_eq!(
            first.url,
            "https://www.example.ac.kr/notice/view.do?list_id=FA1&seq=105"
        );
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert_eq!(first.view_count, 12);
        assert_eq!(records[2].view_count, 1_204);
    }

    #[test]
    fn test_empty_listing_yields_no_records() {
        let records = CommonAdapter
            .parse_listing(&common_listing(&[]), BASE)
            .unwrap();
        assert!(records.is_empty());

        let records = CommonAdapter
            .parse_listing("<html><body><p>maintenance</p></body></html>", BASE)
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_row_without_link_fails_the_page() {
        let markup = common_listing(&[Row::new("105", "2025-03-04", 12)])
            .replace("javascript:fnView('11', '105');", "/notice/105");
        assert!(matches!(
            CommonAdapter.parse_listing(&markup, BASE),
            Err(ParseError::MalformedLink { .. })
        ));
    }

    #[test]
    fn test_row_with_bad_date_fails_the_page() {
        let markup = common_listing(&[Row::new("105", "2025-13-45", 12)]);
        assert!(matches!(
            CommonAdapter.parse_listing(&markup, BASE),
            Err(ParseError::BadDate { .. })
        ));
    }

    #[test]
    fn test_row_missing_view_count_fails_the_page() {
        let markup = common_listing(&[Row::new("105", "2025-03-04", 12)])
            .replace(" <span>12</span>", "");
        assert!(matches!(
            CommonAdapter.parse_listing(&markup, BASE),
            Err(ParseError::MissingElement { what: "view count field" })
        ));
    }

    #[test]
    fn test_detail_extracts_fields_and_tags() {
        let markup = common_detail(
            "Spring scholarship",
            "Student affairs",
            r#"<p class="MsoNormal" style="margin:0"><span lang="EN-US">Apply&nbsp;now</span></p><!-- footer -->"#,
            &["#scholarship", "#spring"],
        );

        let detail = CommonAdapter.parse_detail(&markup).unwrap();
        assert_eq!(detail.title, "Spring scholarship");
        assert_eq!(detail.author, "Student affairs");
        assert_eq!(detail.html, "<p><span>Apply now</span></p>");
        assert_eq!(
            detail.tags,
            Some(vec!["#scholarship".to_string(), "#spring".to_string()])
        );
    }

    #[test]
    fn test_detail_without_hashtags_has_no_tag_list() {
        let markup = common_detail("T", "A", "<p>x</p>", &[]);
        assert_eq!(CommonAdapter.parse_detail(&markup).unwrap().tags, None);
    }

    #[test]
    fn test_detail_missing_body_is_an_error() {
        let markup = common_detail("T", "A", "<p>x</p>", &[]).replace("vw-con", "other");
        assert!(matches!(
            CommonAdapter.parse_detail(&markup),
            Err(ParseError::MissingElement { what: "body" })
        ));
    }
}
