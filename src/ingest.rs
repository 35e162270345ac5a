//! Ingestion controller.
//!
//! A pass walks the origin's listing stream under one of two policies:
//!
//! | Mode            | Processes                         | Stops at                         |
//! |-----------------|-----------------------------------|----------------------------------|
//! | `scrape`        | every record on page 1            | the first record from page 2     |
//! | `scrape_range`  | records dated within `start..=end`| the first record older than start|
//!
//! Every processed record goes through the same steps: compute the scraping
//! key, skip it when already known, otherwise fetch and parse its detail page
//! and stage it. The pass commits once at the end; any error before that
//! drops the transaction and with it everything staged so far.

use crate::adapters::{Adapter, SiteAdapter};
use crate::client::{AccessClient, Fetch, HttpTransport, access_client, retrying_client};
use crate::config::Settings;
use crate::error::ScrapeError;
use crate::models::{Announcement, ListingRecord, NewAnnouncement, Origin};
use crate::pagination::listing_stream;
use crate::store::AnnouncementStore;
use crate::utils::truncate_for_log;
use crate::webhook::Webhook;
use chrono::NaiveDate;
use futures::StreamExt;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Latest,
    Range { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Process,
    Skip,
    Stop,
}

impl Mode {
    fn step(&self, record: &ListingRecord, page: u32) -> Step {
        match *self {
            Mode::Latest if page > 1 => Step::Stop,
            Mode::Latest => Step::Process,
            Mode::Range { start, .. } if record.date < start => Step::Stop,
            Mode::Range { end, .. } if record.date > end => Step::Skip,
            Mode::Range { .. } => Step::Process,
        }
    }
}

/// What one successful pass did.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Rows written by the final commit.
    pub inserted: Vec<Announcement>,
    /// Records skipped because their key was already known.
    pub duplicates: usize,
    /// Records skipped for being newer than the range end.
    pub out_of_range: usize,
    /// Keys another writer committed between our check and our commit.
    pub conflicts: usize,
}

/// Drives scrape passes for origins served by one client.
///
/// The client should be the origin's own [`crate::client::AccessClient`] so
/// listing and detail requests share its rate budget.
pub struct Ingestor<C, S, W = HttpTransport> {
    client: C,
    store: S,
    webhook: Option<Webhook<W>>,
}

impl<C, S> Ingestor<C, S> {
    pub fn new(client: C, store: S) -> Self {
        Ingestor {
            client,
            store,
            webhook: None,
        }
    }
}

impl<S> Ingestor<AccessClient, S> {
    /// Production wiring: a fresh access client (own rate budget) plus the
    /// configured webhook, if any.
    pub fn from_settings(settings: &Settings, store: S) -> Result<Self, reqwest::Error> {
        let http = &settings.http;
        let client = access_client(HttpTransport::new(http)?, http);
        let webhook = match &settings.webhook_url {
            Some(url) => Some(Webhook::new(
                retrying_client(HttpTransport::new(http)?, http),
                url.clone(),
            )),
            None => None,
        };
        Ok(Ingestor::new(client, store).with_webhook(webhook))
    }
}

impl<C, S, W> Ingestor<C, S, W> {
    /// Notify `webhook` of every announcement a pass commits.
    pub fn with_webhook<W2>(self, webhook: Option<Webhook<W2>>) -> Ingestor<C, S, W2> {
        Ingestor {
            client: self.client,
            store: self.store,
            webhook,
        }
    }
}

impl<C: Fetch, S: AnnouncementStore, W: Fetch> Ingestor<C, S, W> {
    /// Latest mode: ingest the first listing page. Returns the number of new rows.
    #[instrument(level = "info", skip_all, fields(origin = %origin.code))]
    pub async fn scrape(&self, origin: &Origin) -> Result<usize, ScrapeError> {
        let report = self.run(origin, 1, Mode::Latest).await?;
        Ok(report.inserted.len())
    }

    /// Range mode: ingest records dated within `start..=end`, paging from
    /// `start_page` until the listing grows older than `start`.
    #[instrument(level = "info", skip_all, fields(origin = %origin.code, %start, %end, start_page))]
    pub async fn scrape_range(
        &self,
        origin: &Origin,
        start: NaiveDate,
        end: NaiveDate,
        start_page: u32,
    ) -> Result<usize, ScrapeError> {
        if start > end {
            return Err(ScrapeError::InvalidRange { start, end });
        }
        let report = self
            .run(origin, start_page, Mode::Range { start, end })
            .await?;
        Ok(report.inserted.len())
    }

    async fn run(
        &self,
        origin: &Origin,
        start_page: u32,
        mode: Mode,
    ) -> Result<PassReport, ScrapeError> {
        let report = self.pass(origin, start_page, mode).await?;
        info!(
            inserted = report.inserted.len(),
            duplicates = report.duplicates,
            out_of_range = report.out_of_range,
            conflicts = report.conflicts,
            "Pass complete"
        );

        if let Some(webhook) = &self.webhook {
            if !report.inserted.is_empty() {
                webhook.notify(origin, &report.inserted).await;
            }
        }
        Ok(report)
    }

    async fn pass(
        &self,
        origin: &Origin,
        start_page: u32,
        mode: Mode,
    ) -> Result<PassReport, ScrapeError> {
        let adapter = Adapter::for_kind(origin.adapter);
        let mut tx = self.store.begin().await?;
        let mut staged_keys: HashSet<String> = HashSet::new();
        let mut report = PassReport::default();

        let records = listing_stream(&self.client, origin, start_page);
        futures::pin_mut!(records);

        while let Some(item) = records.next().await {
            let (record, page) = item?;
            match mode.step(&record, page) {
                Step::Stop => {
                    debug!(id = %record.id, page, date = %record.date, "Stopping pass");
                    break;
                }
                Step::Skip => {
                    debug!(id = %record.id, date = %record.date, "Newer than range end; skipping");
                    report.out_of_range += 1;
                    continue;
                }
                Step::Process => {}
            }

            let key = origin.scraping_key(&record.id);
            if staged_keys.contains(&key) || self.store.contains(&tx, &key).await? {
                debug!(%key, "Already known; skipping");
                report.duplicates += 1;
                continue;
            }

            let new = self.fetch_detail(adapter, origin, &record).await?;
            self.store.stage(&mut tx, new).await?;
            staged_keys.insert(key);
        }

        let staged = tx.len();
        let summary = self.store.commit(tx).await?;
        if !summary.conflicts.is_empty() {
            warn!(
                staged,
                conflicts = ?summary.conflicts,
                "Some keys were committed concurrently; skipped"
            );
        }
        report.conflicts = summary.conflicts.len();
        report.inserted = summary.inserted;
        Ok(report)
    }

    async fn fetch_detail(
        &self,
        adapter: Adapter,
        origin: &Origin,
        record: &ListingRecord,
    ) -> Result<NewAnnouncement, ScrapeError> {
        let response = self.client.get(&record.url).await?;
        let content = adapter.parse_detail(&response.body).map_err(|e| {
            warn!(
                url = %record.url,
                error = %e,
                body_preview = %truncate_for_log(&response.body, 200),
                "Detail page did not match the expected layout"
            );
            ScrapeError::parse(&record.url, e)
        })?;
        Ok(NewAnnouncement::build(origin, record, content))
    }
}
