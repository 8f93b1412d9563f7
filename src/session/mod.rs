//! Session Management Module
//!
//! # Modules
//!
//! - [`entity`] - the per-request [`Session`] handle and its value accessors
//! - [`manager`] - [`SessionManager`], which opens sessions from presented tokens
//!
//! The free functions below are shorthands for a [`SessionManager`] with the JSON
//! codec and default timeouts.

pub mod entity;
pub mod manager;

pub use entity::Session;
pub use manager::{
    SessionConfig, SessionManager, DEFAULT_AUTH_TIMEOUT_SECS, DEFAULT_SESSION_TIMEOUT_SECS,
    GRACE_PERIOD_SECS,
};

use chrono::Duration;
use std::sync::Arc;

use crate::error::SessionError;
use crate::store::EntryStore;
use crate::token::Token;
use crate::value::ValueMap;

/// Open a plain session from `id_token`, see [`SessionManager::open_session`]
///
/// # Errors
///
/// Propagates store and randomness failures.
pub fn open_session(
    id_token: &Token,
    store: Arc<dyn EntryStore>,
) -> Result<(Session, Token), SessionError> {
    SessionManager::with_defaults(store).open_session(id_token)
}

/// Open an auth session, see [`SessionManager::open_session_with_auth`]
///
/// # Errors
///
/// Returns [`SessionError::AuthenticationFailed`] for a rejected auth token and
/// propagates store and randomness failures.
pub fn open_session_with_auth(
    id_token: &Token,
    auth_token: &Token,
    auth_timeout: Duration,
    store: Arc<dyn EntryStore>,
) -> Result<(Session, Token, Token), SessionError> {
    SessionManager::with_defaults(store).open_session_with_auth(id_token, auth_token, auth_timeout)
}

/// Administrative value lookup, see [`SessionManager::find_session_values_by_key`]
///
/// # Errors
///
/// Propagates store failures.
pub fn find_session_values_by_key(
    key: &str,
    store: Arc<dyn EntryStore>,
) -> Result<Option<ValueMap>, SessionError> {
    SessionManager::with_defaults(store).find_session_values_by_key(key)
}
