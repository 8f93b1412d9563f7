//! Testing utilities for httpsession
//!
//! Shared by unit tests and the integration tests under `tests/`, which build
//! with the `testing` feature.
//!
//! ## Organization
//!
//! - [`fixtures`] - ready-made stores, managers and entry manipulation
//! - [`mock`] - entry stores that fail or record what they are asked to do
//!
//! ## Usage
//!
//! ```rust
//! use httpsession::testing::TestFixtures;
//! use httpsession::Token;
//!
//! let (manager, store) = TestFixtures::manager();
//! let (session, token) = manager.open_session(&Token::empty()).unwrap();
//! assert!(session.is_new());
//! assert!(store.is_empty().unwrap());
//! # let _ = token;
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{FailingStore, ReadOnlyStore, RecordingStore};

/// Common test constants
pub mod constants {
    /// Cookie name prefix used by cookie session tests
    pub const TEST_COOKIE_NAME: &str = "testsess";

    /// A well-formed id token that names no stored session
    pub const UNKNOWN_ID_TOKEN: &str = "bm90LWEtcmVhbC1zZXNzaW9uLWtleQ";
}
