//! Session Manager - opening sessions from presented tokens
//!
//! The `SessionManager` wires an [`EntryStore`], a [`SessionCodec`] and a
//! [`SessionConfig`] together and turns a presented id token (plus, for auth
//! sessions, an auth token) into a live [`Session`].
//!
//! ## Open flow
//!
//! 1. Empty or malformed id token: brand-new session.
//! 2. Store lookup. Store errors are fatal; a missing or expired entry yields a
//!    brand-new session.
//! 3. Decode. A plain session falls back to a brand-new session on any decode
//!    failure. An auth session treats a decode failure as an authentication
//!    failure, so corrupting the stored rotation state can never mint a fresh,
//!    unauthenticated session in its place.
//! 4. Auth sessions validate the presented auth token against the decoded state.
//! 5. The session is returned; nothing is written until [`Session::save`].

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use super::entity::{AuthState, Session};
use crate::codec::{CodecError, JsonCodec, RecordKind, SessionCodec};
use crate::error::SessionError;
use crate::rotation::Validation;
use crate::store::EntryStore;
use crate::token::Token;
use crate::value::ValueMap;

/// Default lifetime of a saved session entry, in seconds
pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 600;
/// Default interval after which the auth token rotates, in seconds
pub const DEFAULT_AUTH_TIMEOUT_SECS: i64 = 600;
/// Window after a rotation in which the previous auth token is still honoured, in seconds
pub const GRACE_PERIOD_SECS: i64 = 60;

/// Timeouts used by a [`SessionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub session_timeout: Duration,
    pub auth_timeout: Duration,
    pub grace_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECS),
            auth_timeout: Duration::seconds(DEFAULT_AUTH_TIMEOUT_SECS),
            grace_period: Duration::seconds(GRACE_PERIOD_SECS),
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn EntryStore>,
    codec: Arc<dyn SessionCodec>,
    config: SessionConfig,
}

// =============================================================================
// 1. Construction
// =============================================================================

impl SessionManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn EntryStore>,
        codec: Arc<dyn SessionCodec>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    /// Manager with the JSON codec and default timeouts
    #[must_use]
    pub fn with_defaults(store: Arc<dyn EntryStore>) -> Self {
        Self::new(store, Arc::new(JsonCodec), SessionConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    #[must_use]
    pub fn codec(&self) -> &Arc<dyn SessionCodec> {
        &self.codec
    }
}

// =============================================================================
// 2. Entry points
// =============================================================================

impl SessionManager {
    /// Open a plain session
    ///
    /// Returns the session and the id token the client should hold from now on.
    /// It differs from `id_token` whenever a new session was created.
    ///
    /// An auth entry opened this way exposes its values but no auth token; its
    /// rotation state is written back unchanged on save, so the auth session
    /// stays usable.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store lookup fails and
    /// [`SessionError::Randomness`] if a new key cannot be generated.
    pub fn open_session(&self, id_token: &Token) -> Result<(Session, Token), SessionError> {
        let Some(data) = self.load_entry(id_token)? else {
            return self.new_session(false).map(|s| {
                let token = s.id_token();
                (s, token)
            });
        };

        // An auth entry keeps its rotation state through a plain open and save
        let decoded = match self.codec.decode(&data, RecordKind::WithRotation) {
            Err(CodecError::Rotation(_)) => self.codec.decode(&data, RecordKind::Plain),
            other => other,
        };

        match decoded {
            Ok(record) => {
                let (set, rotation) = record.into_parts();
                let session = self
                    .session_from(id_token, set, None)
                    .with_retained_rotation(rotation);
                Ok((session, id_token.clone()))
            }
            Err(e) => {
                debug!("Unusable session entry, starting a new session: {e}");
                let session = self.new_session(false)?;
                let token = session.id_token();
                Ok((session, token))
            }
        }
    }

    /// Open an auth session, validating the presented auth token
    ///
    /// Returns the session, the id token and the auth token the client should
    /// hold. If this request makes a rotation due, the returned auth token is
    /// already the next generation's; it validates once the session is saved.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AuthenticationFailed`] if the auth token does not
    /// validate or the stored rotation state is unreadable. Nothing is written to
    /// the store in that case. Store and randomness failures propagate.
    pub fn open_session_with_auth(
        &self,
        id_token: &Token,
        auth_token: &Token,
        auth_timeout: Duration,
    ) -> Result<(Session, Token, Token), SessionError> {
        let Some(data) = self.load_entry(id_token)? else {
            let session = self.new_session(true)?;
            return Ok(Self::auth_triple(session));
        };

        let record = self
            .codec
            .decode(&data, RecordKind::WithRotation)
            .map_err(|e| {
                warn!("Stored rotation state unreadable, rejecting request: {e}");
                SessionError::AuthenticationFailed(format!("corrupted session state: {e}"))
            })?;

        let (set, rotation) = record.into_parts();
        let rotation = rotation.ok_or_else(|| {
            SessionError::AuthenticationFailed("session entry has no rotation state".to_string())
        })?;

        let validation = rotation.validate(
            auth_token.as_str(),
            auth_timeout,
            self.config.grace_period,
            Utc::now(),
        )?;

        let auth = AuthState {
            rotation,
            pending_rotation: validation == Validation::RotationDue,
            in_grace: validation == Validation::Grace,
        };
        let session = self.session_from(id_token, set, Some(auth));
        Ok(Self::auth_triple(session))
    }

    /// Read the values of a stored session without any token validation
    ///
    /// Meant for diagnostics and administration. Never expose it on a path
    /// reachable by clients without separate authorization.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store lookup fails. Missing,
    /// expired and undecodable entries are `Ok(None)`.
    pub fn find_session_values_by_key(&self, key: &str) -> Result<Option<ValueMap>, SessionError> {
        let Some(data) = self.load_entry(&Token::from(key))? else {
            return Ok(None);
        };
        match self.codec.decode(&data, RecordKind::Plain) {
            Ok(record) => Ok(Some(record.into_parts().0.values)),
            Err(e) => {
                debug!("Session entry for lookup is undecodable: {e}");
                Ok(None)
            }
        }
    }
}

// =============================================================================
// 3. Helpers
// =============================================================================

impl SessionManager {
    /// Bytes of the live entry named by `id_token`, if there is one
    fn load_entry(&self, id_token: &Token) -> Result<Option<Vec<u8>>, SessionError> {
        if !id_token.is_well_formed() {
            if !id_token.is_empty() {
                debug!("Ignoring malformed session id token");
            }
            return Ok(None);
        }

        let Some(entry) = self.store.find_entry(id_token.as_str())? else {
            debug!("No session entry for presented id token");
            return Ok(None);
        };

        if entry.is_expired_at(Utc::now()) {
            debug!("Session entry expired at {}", entry.expiry);
            return Ok(None);
        }
        Ok(Some(entry.data))
    }

    fn new_session(&self, with_auth: bool) -> Result<Session, SessionError> {
        let session = Session::fresh(with_auth, self.store.clone(), self.codec.clone())?;
        info!(
            "Created new {} session",
            if with_auth { "auth" } else { "plain" }
        );
        Ok(session)
    }

    fn session_from(
        &self,
        id_token: &Token,
        set: crate::codec::ValueSet,
        auth: Option<AuthState>,
    ) -> Session {
        Session::from_parts(
            id_token.as_str().to_string(),
            set,
            auth,
            false,
            self.store.clone(),
            self.codec.clone(),
        )
    }

    fn auth_triple(session: Session) -> (Session, Token, Token) {
        let id = session.id_token();
        let auth = session.auth_token().unwrap_or_default();
        (session, id, auth)
    }
}
