//! JSON-file-backed announcement store.
//!
//! The file is the source of truth; several processes (the scheduler and an
//! on-demand `scrape`, say) may hold handles on the same path:
//! ```text
//! announcements.json        # pretty-printed array of Announcement
//! announcements.json.tmp    # written first, then renamed over the data file
//! announcements.json.lock   # advisory lock held for the whole commit
//! ```
//!
//! A commit takes the lock, re-reads the file, applies the transaction to
//! what is on disk (so rows written by another handle are kept and their
//! keys show up as conflicts), writes, and releases. `begin` reloads the
//! file so a pass starts from the latest committed rows.

use super::memory::{MemoryStore, Table};
use super::{AnnouncementStore, CommitSummary, Transaction};
use crate::error::StoreError;
use crate::models::Announcement;
use chrono::Utc;
use fd_lock::RwLock;
use std::fs as stdfs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    table: MemoryStore,
}

impl JsonStore {
    /// Load the table stored at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - JSON data file; the lock and temp files live next to it
    ///
    /// # Returns
    ///
    /// A handle whose in-memory table mirrors the file. A missing file opens
    /// as an empty store and is created by the first commit that inserts.
    ///
    /// # Errors
    ///
    /// `StoreError::Io` when the file exists but cannot be read, and
    /// `StoreError::Serde` when it is not an array of announcements.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let store = JsonStore::open(&settings.store_path).await?;
    /// let ingestor = Ingestor::from_settings(&settings, store)?;
    /// ```
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let rows = load_rows(&path).await?;
        info!(rows = rows.len(), "Opened announcement store");

        Ok(JsonStore {
            path,
            table: MemoryStore::with_table(Table::from_rows(rows)),
        })
    }

    async fn reload(&self) -> Result<(), StoreError> {
        let rows = load_rows(&self.path).await?;
        debug!(rows = rows.len(), "Reloaded announcement store");
        self.table.replace(Table::from_rows(rows))
    }
}

async fn load_rows(path: &Path) -> Result<Vec<Announcement>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn read_rows(path: &Path) -> Result<Vec<Announcement>, StoreError> {
    match stdfs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Lock, re-read, apply, write. Blocking; run it off the async workers.
fn commit_locked(path: &Path, tx: Transaction) -> Result<(Table, CommitSummary), StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        stdfs::create_dir_all(dir)?;
    }
    let lock_file = stdfs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(sibling(path, ".lock"))?;
    let mut lock = RwLock::new(lock_file);
    let _guard = lock.write()?;

    let mut table = Table::from_rows(read_rows(path)?);
    let summary = table.apply(tx, Utc::now());
    if !summary.inserted.is_empty() {
        let json = serde_json::to_string_pretty(table.rows())?;
        let tmp = sibling(path, ".tmp");
        stdfs::write(&tmp, json)?;
        stdfs::rename(&tmp, path)?;
    }
    Ok((table, summary))
}

impl AnnouncementStore for JsonStore {
    async fn begin(&self) -> Result<Transaction, StoreError> {
        self.reload().await?;
        Ok(Transaction::default())
    }

    async fn contains(&self, tx: &Transaction, key: &str) -> Result<bool, StoreError> {
        self.table.contains(tx, key).await
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), staged = tx.len()))]
    async fn commit(&self, tx: Transaction) -> Result<CommitSummary, StoreError> {
        if tx.is_empty() {
            return Ok(CommitSummary::default());
        }

        let path = self.path.clone();
        let (table, summary) = tokio::task::spawn_blocking(move || commit_locked(&path, tx))
            .await
            .map_err(io::Error::other)??;

        // the in-memory table only moves forward once the file is written
        self.table.replace(table)?;
        info!(
            inserted = summary.inserted.len(),
            conflicts = summary.conflicts.len(),
            "Committed announcements"
        );
        Ok(summary)
    }

    async fn find(&self, key: &str) -> Result<Option<Announcement>, StoreError> {
        self.table.find(key).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.table.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::new_announcement;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("board_scraper_{}_{}", std::process::id(), name))
            .join("announcements.json")
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    async fn commit_keys(store: &JsonStore, keys: &[&str]) -> CommitSummary {
        let mut tx = store.begin().await.unwrap();
        for key in keys {
            store.stage(&mut tx, new_announcement(key)).await.unwrap();
        }
        store.commit(tx).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let path = temp_path("missing");
        cleanup(&path);
        let store = JsonStore::open(&path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_commit_persists_across_reopen() {
        let path = temp_path("reopen");
        cleanup(&path);

        let store = JsonStore::open(&path).await.unwrap();
        let summary = commit_keys(&store, &["FA1-1", "FA1-2"]).await;
        assert_eq!(summary.inserted.len(), 2);

        let reopened = JsonStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let row = reopened.find("FA1-2").await.unwrap().unwrap();
        assert_eq!(row.id, 2);
        assert_eq!(row.detail.url, "https://example.com/view.do?seq=FA1-2");

        // ids continue after reopening; known keys conflict
        let summary = commit_keys(&reopened, &["FA1-2", "FA1-3"]).await;
        assert_eq!(summary.conflicts, vec!["FA1-2".to_string()]);
        assert_eq!(summary.inserted[0].id, 3);

        cleanup(&path);
    }

    #[tokio::test]
    async fn test_two_handles_keep_each_others_rows() {
        let path = temp_path("two_handles");
        cleanup(&path);
        let scheduler = JsonStore::open(&path).await.unwrap();
        let on_demand = JsonStore::open(&path).await.unwrap();

        commit_keys(&on_demand, &["FA1-1"]).await;

        // a new pass on the other handle sees the committed row
        let mut tx = scheduler.begin().await.unwrap();
        assert!(scheduler.contains(&tx, "FA1-1").await.unwrap());
        scheduler
            .stage(&mut tx, new_announcement("FA1-2"))
            .await
            .unwrap();
        let summary = scheduler.commit(tx).await.unwrap();
        assert_eq!(summary.inserted.len(), 1);
        assert_eq!(summary.inserted[0].id, 2);

        let reopened = JsonStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        assert!(reopened.find("FA1-1").await.unwrap().is_some());
        assert!(reopened.find("FA1-2").await.unwrap().is_some());
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_stale_handle_reports_conflict_instead_of_overwriting() {
        let path = temp_path("stale_handle");
        cleanup(&path);
        let first = JsonStore::open(&path).await.unwrap();
        let second = JsonStore::open(&path).await.unwrap();

        // both passes check before either commits
        let mut tx_first = first.begin().await.unwrap();
        let mut tx_second = second.begin().await.unwrap();
        assert!(!first.contains(&tx_first, "FA1-5").await.unwrap());
        assert!(!second.contains(&tx_second, "FA1-5").await.unwrap());
        first.stage(&mut tx_first, new_announcement("FA1-5")).await.unwrap();
        second.stage(&mut tx_second, new_announcement("FA1-5")).await.unwrap();
        second.stage(&mut tx_second, new_announcement("FA1-6")).await.unwrap();

        assert_eq!(first.commit(tx_first).await.unwrap().inserted.len(), 1);
        let summary = second.commit(tx_second).await.unwrap();
        assert_eq!(summary.conflicts, vec!["FA1-5".to_string()]);
        assert_eq!(summary.inserted.len(), 1);

        let reopened = JsonStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        assert_eq!(reopened.find("FA1-5").await.unwrap().unwrap().id, 1);
        // the committing handle's own view includes the other writer's row
        assert_eq!(second.count().await.unwrap(), 2);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_empty_transaction_does_not_create_file() {
        let path = temp_path("empty_tx");
        cleanup(&path);
        let store = JsonStore::open(&path).await.unwrap();
        let summary = commit_keys(&store, &[]).await;
        assert!(summary.inserted.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonStore::open(&path).await,
            Err(StoreError::Serde(_))
        ));
        cleanup(&path);
    }
}
