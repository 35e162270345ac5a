//! Lazy paginated listing traversal.
//!
//! [`listing_stream`] yields `(record, page)` pairs, fetching and parsing one
//! listing page each time its buffer runs dry. The first page that parses to
//! zero records ends the stream; there is no page cap. The first fetch or
//! parse error is yielded and ends the stream as well.

use crate::adapters::{Adapter, SiteAdapter};
use crate::client::Fetch;
use crate::error::{ParseError, ScrapeError};
use crate::models::{ListingRecord, Origin};
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use tracing::{debug, info};
use url::Url;

/// Query parameter carrying the 1-based page index.
pub const PAGE_PARAM: &str = "pageIndex";

/// Listing URL for `page`.
pub fn page_url(listing_url: &str, page: u32) -> Result<String, ParseError> {
    let mut url = Url::parse(listing_url).map_err(|source| ParseError::BadBaseUrl {
        base: listing_url.to_string(),
        source,
    })?;
    url.query_pairs_mut()
        .append_pair(PAGE_PARAM, &page.to_string());
    Ok(url.to_string())
}

struct Cursor {
    next_page: u32,
    current_page: u32,
    pending: VecDeque<ListingRecord>,
}

/// Stream the origin's listing starting at `start_page`.
///
/// Pages are fetched one at a time through `client`, only when the records
/// of the previous page have been consumed. Each call starts a fresh
/// traversal; a stream cannot be resumed after it ends or fails.
///
/// # Arguments
///
/// * `client` - The origin's access client; every page request goes through it
/// * `origin` - Supplies the listing URL and the adapter kind
/// * `start_page` - 1-based index of the first page to fetch
///
/// # Returns
///
/// A stream of `(record, page)` pairs. It ends after the first page that
/// parses to zero records, or after yielding the first error:
/// - `ScrapeError::Fetch` when a page request fails
/// - `ScrapeError::Parse` when a page does not match the adapter's layout
///
/// # Examples
///
/// ```ignore
/// let records = listing_stream(&client, &origin, 1);
/// futures::pin_mut!(records);
/// while let Some((record, page)) = records.try_next().await? {
///     println!("{} on page {}", record.id, page);
/// }
/// ```
pub fn listing_stream<'a, C: Fetch>(
    client: &'a C,
    origin: &'a Origin,
    start_page: u32,
) -> impl Stream<Item = Result<(ListingRecord, u32), ScrapeError>> + 'a {
    let adapter = Adapter::for_kind(origin.adapter);
    let cursor = Cursor {
        next_page: start_page,
        current_page: start_page,
        pending: VecDeque::new(),
    };

    stream::try_unfold(cursor, move |cursor| advance(client, origin, adapter, cursor))
}

/// Next record, fetching pages until one is buffered or a page comes back empty.
async fn advance<C: Fetch>(
    client: &C,
    origin: &Origin,
    adapter: Adapter,
    mut cursor: Cursor,
) -> Result<Option<((ListingRecord, u32), Cursor)>, ScrapeError> {
    loop {
        if let Some(record) = cursor.pending.pop_front() {
            let page = cursor.current_page;
            return Ok(Some(((record, page), cursor)));
        }

        let page = cursor.next_page;
        let url = page_url(&origin.listing_url, page)
            .map_err(|e| ScrapeError::parse(&origin.listing_url, e))?;
        info!(origin = %origin.code, page, %url, "Fetching listing page");

        let response = client.get(&url).await?;
        let records = adapter
            .parse_listing(&response.body, &origin.listing_url)
            .map_err(|e| ScrapeError::parse(&url, e))?;

        if records.is_empty() {
            debug!(origin = %origin.code, page, "No records on page; stopping");
            return Ok(None);
        }

        debug!(origin = %origin.code, page, records = records.len(), "Parsed listing page");
        cursor.current_page = page;
        cursor.next_page = page + 1;
        cursor.pending.extend(records);
    }
}
