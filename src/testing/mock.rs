//! Fake entry stores for exercising error paths and write behaviour

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::store::{EntryStore, MemoryStore, SessionEntry, StoreError};

/// Store whose every operation fails with [`StoreError::Unavailable`]
#[derive(Debug, Default)]
pub struct FailingStore;

impl EntryStore for FailingStore {
    fn find_entry(&self, _key: &str) -> Result<Option<SessionEntry>, StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }

    fn add_entry(&self, _key: &str, _entry: SessionEntry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("backend offline".to_string()))
    }
}

/// Store that reads fine but refuses writes
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

impl ReadOnlyStore {
    #[must_use]
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner }
    }
}

impl EntryStore for ReadOnlyStore {
    fn find_entry(&self, key: &str) -> Result<Option<SessionEntry>, StoreError> {
        self.inner.find_entry(key)
    }

    fn add_entry(&self, _key: &str, _entry: SessionEntry) -> Result<(), StoreError> {
        Err(StoreError::Backend("store is read-only".into()))
    }
}

/// In-memory store that counts lookups and writes
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    finds: AtomicUsize,
    writes: AtomicUsize,
}

impl RecordingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_entry` calls so far
    #[must_use]
    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    /// Number of `add_entry` calls so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The wrapped store, for direct inspection
    #[must_use]
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl EntryStore for RecordingStore {
    fn find_entry(&self, key: &str) -> Result<Option<SessionEntry>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_entry(key)
    }

    fn add_entry(&self, key: &str, entry: SessionEntry) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.add_entry(key, entry)
    }
}
