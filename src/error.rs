//! Error types for the session layer.
//!
//! Two families live here. [`SessionError`] is returned from fallible
//! operations (open, save, recreate) and is always fatal for the request.
//! [`ValueAccessError`] is never returned: typed value getters record it on the
//! session's last-error slot and hand back the type's zero value.

use std::fmt;

use crate::codec::CodecError;
use crate::store::StoreError;

/// Errors that abort a session operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The presented auth token is neither current nor an honoured previous
    /// token, or the stored rotation state could not be read back.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The entry store failed. Propagated verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operating system RNG failed while creating a key or secret.
    #[error("secure random generation failed: {0}")]
    Randomness(String),

    /// The session record could not be encoded for saving.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl SessionError {
    /// `true` for errors caused by the client presenting bad credentials
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, SessionError::AuthenticationFailed(_))
    }
}

/// Non-fatal value lookup failure recorded on the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueAccessError {
    /// No value stored under the key
    MissingValue { key: String },
    /// A value exists but cannot be read as the requested type
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for ValueAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueAccessError::MissingValue { key } => {
                write!(f, "unknown session value named: {key}")
            }
            ValueAccessError::TypeMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "session value {key} has type {found}, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for ValueAccessError {}
