//! In-process announcement table.

use super::{AnnouncementStore, CommitSummary, Transaction};
use crate::error::StoreError;
use crate::models::Announcement;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Rows plus the unique index on the scraping key.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    rows: Vec<Announcement>,
    by_key: HashMap<String, usize>,
    next_id: u64,
}

impl Table {
    pub(crate) fn from_rows(rows: Vec<Announcement>) -> Self {
        let by_key = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.scraping_key.clone(), i))
            .collect();
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Table {
            rows,
            by_key,
            next_id,
        }
    }

    pub(crate) fn rows(&self) -> &[Announcement] {
        &self.rows
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Announcement> {
        self.by_key.get(key).map(|&i| &self.rows[i])
    }

    /// Insert staged rows in order, skipping keys that are already taken.
    pub(crate) fn apply(&mut self, tx: Transaction, now: DateTime<Utc>) -> CommitSummary {
        let mut summary = CommitSummary::default();
        for new in tx.into_staged() {
            if self.contains(&new.scraping_key) {
                debug!(key = %new.scraping_key, "Key already present at commit; skipping");
                summary.conflicts.push(new.scraping_key);
                continue;
            }
            let id = self.next_id.max(1);
            self.next_id = id + 1;
            let row = Announcement::from_new(id, new, now);
            self.by_key.insert(row.scraping_key.clone(), self.rows.len());
            self.rows.push(row.clone());
            summary.inserted.push(row);
        }
        summary
    }
}

/// Cheap to clone; clones share one table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryStore {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_table(table: Table) -> Self {
        MemoryStore {
            table: Arc::new(Mutex::new(table)),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Table>, StoreError> {
        self.table.lock().map_err(|_| StoreError::Poisoned)
    }

    pub(crate) fn replace(&self, table: Table) -> Result<(), StoreError> {
        *self.lock()? = table;
        Ok(())
    }

    /// Every committed row, oldest first.
    #[cfg(test)]
    pub fn snapshot(&self) -> Result<Vec<Announcement>, StoreError> {
        Ok(self.lock()?.rows().to_vec())
    }
}

impl AnnouncementStore for MemoryStore {
    async fn contains(&self, tx: &Transaction, key: &str) -> Result<bool, StoreError> {
        Ok(tx.is_staged(key) || self.lock()?.contains(key))
    }

    async fn commit(&self, tx: Transaction) -> Result<CommitSummary, StoreError> {
        let mut table = self.lock()?;
        Ok(table.apply(tx, Utc::now()))
    }

    async fn find(&self, key: &str) -> Result<Option<Announcement>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.rows().len())
    }
}
