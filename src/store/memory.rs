//! In-memory entry store
//!
//! A mutex-guarded map. Once it holds more than `prune_threshold` entries, every
//! upsert also drops the entries that have expired. Entries are lost on restart.

use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{EntryStore, SessionEntry, StoreError};

/// Entry count above which upserts prune expired entries
pub const DEFAULT_PRUNE_THRESHOLD: usize = 1000;

#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, SessionEntry>>,
    prune_threshold: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_prune_threshold(DEFAULT_PRUNE_THRESHOLD)
    }

    #[must_use]
    pub fn with_prune_threshold(prune_threshold: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            prune_threshold,
        }
    }

    /// Number of entries currently held, expired ones included
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SessionEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl EntryStore for MemoryStore {
    fn find_entry(&self, key: &str) -> Result<Option<SessionEntry>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn add_entry(&self, key: &str, entry: SessionEntry) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), entry);

        if entries.len() > self.prune_threshold {
            let now = Utc::now();
            let before = entries.len();
            entries.retain(|_, e| !e.is_expired_at(now));
            debug!("Pruned {} expired session entries", before - entries.len());
        }
        Ok(())
    }
}
