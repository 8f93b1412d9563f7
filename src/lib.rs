#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Server-side HTTP sessions with opaque ids and rotating authentication tokens.
//!
//! A session is named by a random id token. Auth sessions additionally carry an
//! auth token derived from a per-session secret and a generation counter; the
//! token rotates on a timer while the id stays put, which bounds how long a
//! captured auth token is useful.
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrono::Duration;
//! use httpsession::{MemoryStore, SessionManager, Token};
//!
//! let manager = SessionManager::with_defaults(Arc::new(MemoryStore::new()));
//! let (mut session, id_token) = manager.open_session(&Token::empty())?;
//! session.set_var("counter", 1);
//! session.save(Duration::minutes(10))?;
//!
//! let (session, _) = manager.open_session(&id_token)?;
//! assert_eq!(session.int_var("counter"), 1);
//! # Ok::<(), httpsession::SessionError>(())
//! ```

/// Version of the httpsession crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod codec;
pub mod cookie_session;
pub mod error;
pub mod rotation;
pub mod session;
pub mod settings;
pub mod store;
pub mod token;
pub mod utils;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use codec::{JsonCodec, SessionCodec};
pub use cookie_session::{AuthCookieSession, CookieSession};
pub use error::{SessionError, ValueAccessError};
pub use session::{
    find_session_values_by_key, open_session, open_session_with_auth, Session, SessionConfig,
    SessionManager,
};
pub use settings::Settings;
pub use store::{EntryStore, MemoryStore, SessionEntry, StoreError};
pub use token::{Token, TokenCarrier};
pub use value::{Value, ValueMap};

#[cfg(feature = "cbor")]
pub use codec::CborCodec;
