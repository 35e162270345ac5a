//! Interval scheduler: one polling loop per registered origin.
//!
//! Every origin gets its own [`Ingestor`] and therefore its own access client
//! and rate budget; all of them write to the same store. The first pass for
//! an origin runs one full interval after start. A failed pass is logged and
//! the origin simply waits for its next tick.

use crate::client::Fetch;
use crate::config::Settings;
use crate::ingest::Ingestor;
use crate::models::Origin;
use crate::store::AnnouncementStore;
use futures::future::join_all;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info, instrument, warn};

/// Period between passes for `origin`. Never zero.
pub fn poll_period(origin: &Origin) -> Duration {
    Duration::from_secs(origin.poll_interval_minutes.max(1) * 60)
}

/// Run `scrape` for `origin` once per period, forever.
#[instrument(level = "info", skip_all, fields(origin = %origin.code))]
pub async fn poll_origin<C, S, W>(origin: &Origin, ingestor: &Ingestor<C, S, W>)
where
    C: Fetch,
    S: AnnouncementStore,
    W: Fetch,
{
    let period = poll_period(origin);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "Polling loop started");

    loop {
        ticker.tick().await;
        match ingestor.scrape(origin).await {
            Ok(count) => info!(new = count, "Scheduled pass finished"),
            Err(e) => error!(error = %e, "Scheduled pass failed; waiting for next tick"),
        }
    }
}

/// Poll every registered origin until Ctrl-C.
pub async fn run<S>(settings: &Settings, store: S) -> Result<(), reqwest::Error>
where
    S: AnnouncementStore + Clone,
{
    let registry = settings.registry();
    if registry.origins().is_empty() {
        warn!("No origins registered; nothing to schedule");
        return Ok(());
    }

    let mut workers = Vec::with_capacity(registry.origins().len());
    for origin in registry.origins() {
        workers.push((origin, Ingestor::from_settings(settings, store.clone())?));
    }
    info!(origins = workers.len(), "Scheduler started");

    let loops = join_all(
        workers
            .iter()
            .map(|(origin, ingestor)| poll_origin(origin, ingestor)),
    );

    tokio::select! {
        _ = loops => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Ctrl-C received; stopping scheduler"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C; stopping scheduler"),
            }
        }
    }
    Ok(())
}
