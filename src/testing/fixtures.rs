//! Test fixtures providing pre-built stores and managers
//!
//! Besides construction helpers, [`TestFixtures`] can reach into a store and
//! rewrite an entry in place. That is how tests move a session's rotation clock
//! or expiry into the past without sleeping.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::codec::{JsonCodec, RecordKind, SessionCodec, SessionRecord};
use crate::session::{SessionConfig, SessionManager};
use crate::store::{EntryStore, MemoryStore, SessionEntry};
use crate::token::Token;

/// Central fixture provider for test data
pub struct TestFixtures;

impl TestFixtures {
    /// Empty in-memory store
    #[must_use]
    pub fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    /// Manager with default configuration over a fresh store
    #[must_use]
    pub fn manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Self::store();
        (SessionManager::with_defaults(store.clone()), store)
    }

    /// Manager over a fresh store with an explicit codec
    #[must_use]
    pub fn manager_with_codec(
        codec: Arc<dyn SessionCodec>,
    ) -> (SessionManager, Arc<MemoryStore>) {
        let store = Self::store();
        let manager = SessionManager::new(store.clone(), codec, SessionConfig::default());
        (manager, store)
    }

    /// Short auth timeout used by rotation tests
    #[must_use]
    pub fn auth_timeout() -> Duration {
        Duration::seconds(30)
    }

    /// Move the rotation clock of a stored auth session `ago` into the past
    ///
    /// # Panics
    ///
    /// Panics if the entry is missing or has no rotation state.
    pub fn backdate_rotation(store: &dyn EntryStore, id_token: &Token, ago: Duration) {
        Self::rewrite_entry(store, id_token, |record| match record {
            SessionRecord::WithRotation(set, mut rotation) => {
                rotation.rotation_start = Some(Utc::now() - ago);
                SessionRecord::WithRotation(set, rotation)
            }
            SessionRecord::Plain(_) => panic!("entry has no rotation state"),
        });
    }

    /// Move the expiry of a stored entry into the past
    ///
    /// # Panics
    ///
    /// Panics if the entry is missing.
    pub fn expire_entry(store: &dyn EntryStore, id_token: &Token) {
        let entry = store
            .find_entry(id_token.as_str())
            .unwrap()
            .expect("entry to expire");
        store
            .add_entry(
                id_token.as_str(),
                SessionEntry::new(entry.data, Utc::now() - Duration::seconds(1)),
            )
            .unwrap();
    }

    /// Store raw bytes under `key`, live for a minute
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the write.
    pub fn put_raw(store: &dyn EntryStore, key: &str, data: &[u8]) {
        store
            .add_entry(
                key,
                SessionEntry::new(data.to_vec(), Utc::now() + Duration::minutes(1)),
            )
            .unwrap();
    }

    /// Decode a stored JSON auth entry, transform it and write it back
    ///
    /// # Panics
    ///
    /// Panics if the entry is missing or not a JSON auth record.
    pub fn rewrite_entry<F>(store: &dyn EntryStore, id_token: &Token, f: F)
    where
        F: FnOnce(SessionRecord) -> SessionRecord,
    {
        let entry = store
            .find_entry(id_token.as_str())
            .unwrap()
            .expect("entry to rewrite");
        let record = JsonCodec
            .decode(&entry.data, RecordKind::WithRotation)
            .unwrap();
        let data = JsonCodec.encode(&f(record)).unwrap();
        store
            .add_entry(id_token.as_str(), SessionEntry::new(data, entry.expiry))
            .unwrap();
    }
}
