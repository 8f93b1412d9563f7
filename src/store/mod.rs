//! Entry store boundary
//!
//! Sessions persist as opaque byte blobs with an expiry, keyed by session id.
//! Backends implement [`EntryStore`]; the crate ships only [`MemoryStore`].
//!
//! The contract is deliberately small:
//!
//! - `find_entry` returns `Ok(None)` for unknown keys. Expiry is enforced by the
//!   caller, so a backend may return an expired entry.
//! - `add_entry` replaces the whole entry for a key (upsert). Partial updates
//!   never happen.
//! - Both may be called concurrently from independent requests; any locking a
//!   backend needs is its own business.

pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

/// A persisted session entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub data: Vec<u8>,
    pub expiry: DateTime<Utc>,
}

impl SessionEntry {
    #[must_use]
    pub fn new(data: Vec<u8>, expiry: DateTime<Utc>) -> Self {
        Self { data, expiry }
    }

    /// `true` once `now` has reached the entry's expiry
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

/// Errors reported by an entry store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    /// Any other backend failure
    #[error("session store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Key to entry storage with expiry
pub trait EntryStore: Send + Sync {
    /// Fetch the entry stored under `key`
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails. A missing key is `Ok(None)`.
    fn find_entry(&self, key: &str) -> Result<Option<SessionEntry>, StoreError>;

    /// Store `entry` under `key`, replacing any previous entry
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn add_entry(&self, key: &str, entry: SessionEntry) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_entry_expiry() {
        let now = Utc::now();
        let entry = SessionEntry::new(vec![1], now + Duration::seconds(5));
        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + Duration::seconds(5)));
        assert!(entry.is_expired_at(now + Duration::seconds(6)));
    }
}
