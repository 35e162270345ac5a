//! Announcement persistence.
//!
//! A pass works against one [`Transaction`]: lookups see both committed rows
//! and rows staged earlier in the same transaction, and nothing becomes
//! visible to other passes until [`AnnouncementStore::commit`]. Dropping a
//! transaction discards everything staged in it.
//!
//! The scraping key is unique across the table. Two passes that both staged
//! the same key race at commit time; the loser's row is reported in
//! [`CommitSummary::conflicts`] and skipped, not raised as an error.
//!
//! # Implementations
//!
//! - [`memory::MemoryStore`]: in-process table
//! - [`JsonStore`]: the same table, re-read from and written to a JSON file under a file lock

pub mod json;
pub mod memory;

pub use json::JsonStore;
#[cfg(test)]
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{Announcement, NewAnnouncement};
use std::collections::HashSet;

/// Rows staged by one pass.
#[derive(Debug, Default)]
pub struct Transaction {
    staged: Vec<NewAnnouncement>,
    keys: HashSet<String>,
}

impl Transaction {
    pub fn is_staged(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn push(&mut self, new: NewAnnouncement) {
        self.keys.insert(new.scraping_key.clone());
        self.staged.push(new);
    }

    fn into_staged(self) -> Vec<NewAnnouncement> {
        self.staged
    }
}

/// Outcome of a commit.
#[derive(Debug, Default)]
pub struct CommitSummary {
    /// Rows that were written, in staging order.
    pub inserted: Vec<Announcement>,
    /// Keys that already existed when the commit ran.
    pub conflicts: Vec<String>,
}

/// Trait for transactional announcement storage.
pub trait AnnouncementStore {
    async fn begin(&self) -> Result<Transaction, StoreError> {
        Ok(Transaction::default())
    }

    /// Whether `key` is committed or already staged in `tx`.
    async fn contains(&self, tx: &Transaction, key: &str) -> Result<bool, StoreError>;

    async fn stage(&self, tx: &mut Transaction, new: NewAnnouncement) -> Result<(), StoreError> {
        tx.push(new);
        Ok(())
    }

    /// Write every staged row whose key is still free.
    async fn commit(&self, tx: Transaction) -> Result<CommitSummary, StoreError>;

    async fn find(&self, key: &str) -> Result<Option<Announcement>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
