//! The per-request session handle
//!
//! A [`Session`] lives for one request. Mutations stay in memory until
//! [`Session::save`] writes the whole record back to the store.
//!
//! Typed getters follow a zero-value-on-miss contract: a missing key or a type
//! mismatch records a [`ValueAccessError`] on the session and returns the type's
//! zero value. A successful read clears the slot. Check
//! [`Session::last_error`] after a read when the default is not acceptable.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use std::cell::RefCell;
use std::sync::Arc;

use crate::codec::{SessionCodec, SessionRecord, ValueSet};
use crate::error::{SessionError, ValueAccessError};
use crate::rotation::RotationState;
use crate::store::{EntryStore, SessionEntry};
use crate::token::Token;
use crate::utils::crypto::generate_session_key;
use crate::value::{Value, ValueMap};

/// Rotation state of an auth session plus what this request learned about it
#[derive(Debug, Clone)]
pub(crate) struct AuthState {
    pub(crate) rotation: RotationState,
    pub(crate) pending_rotation: bool,
    pub(crate) in_grace: bool,
}

pub struct Session {
    key: String,
    values: ValueMap,
    updated_at: Option<DateTime<Utc>>,
    auth: Option<AuthState>,
    /// Rotation state of an auth entry opened as a plain session, written back untouched
    retained_rotation: Option<RotationState>,
    is_new: bool,
    store: Arc<dyn EntryStore>,
    codec: Arc<dyn SessionCodec>,
    last_error: RefCell<Option<ValueAccessError>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys and secrets stay out of debug output
        f.debug_struct("Session")
            .field("values", &self.values)
            .field("updated_at", &self.updated_at)
            .field("is_auth", &self.auth.is_some())
            .field("is_new", &self.is_new)
            .field("codec", &self.codec.name())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Construction
// =============================================================================

impl Session {
    pub(crate) fn from_parts(
        key: String,
        set: ValueSet,
        auth: Option<AuthState>,
        is_new: bool,
        store: Arc<dyn EntryStore>,
        codec: Arc<dyn SessionCodec>,
    ) -> Self {
        Self {
            key,
            values: set.values,
            updated_at: set.updated_at,
            auth,
            retained_rotation: None,
            is_new,
            store,
            codec,
            last_error: RefCell::new(None),
        }
    }

    pub(crate) fn with_retained_rotation(mut self, rotation: Option<RotationState>) -> Self {
        self.retained_rotation = rotation;
        self
    }

    /// Brand-new session with a fresh random key and no values
    pub(crate) fn fresh(
        with_auth: bool,
        store: Arc<dyn EntryStore>,
        codec: Arc<dyn SessionCodec>,
    ) -> Result<Self, SessionError> {
        let key = generate_session_key()?;
        let auth = if with_auth {
            Some(AuthState {
                rotation: RotationState::generate()?,
                pending_rotation: false,
                in_grace: false,
            })
        } else {
            None
        };
        Ok(Self::from_parts(
            key,
            ValueSet::default(),
            auth,
            true,
            store,
            codec,
        ))
    }
}

// =============================================================================
// Identity and rotation
// =============================================================================

impl Session {
    /// Store key of this session
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Id token to hand to the client
    #[must_use]
    pub fn id_token(&self) -> Token {
        Token::new(self.key.clone())
    }

    /// Auth token the client holds once this session is saved
    ///
    /// While a rotation is pending this is already the next generation's token,
    /// which only validates after [`Session::save`] persisted the rotation.
    /// `None` for plain sessions.
    #[must_use]
    pub fn auth_token(&self) -> Option<Token> {
        self.auth.as_ref().map(|auth| {
            if auth.pending_rotation {
                Token::new(auth.rotation.next_auth_token())
            } else {
                Token::new(auth.rotation.auth_token())
            }
        })
    }

    /// Whether this request was accepted with the previous auth token
    #[must_use]
    pub fn in_grace_period(&self) -> bool {
        self.auth.as_ref().is_some_and(|auth| auth.in_grace)
    }

    /// Whether the next save advances the auth token generation
    #[must_use]
    pub fn rotation_pending(&self) -> bool {
        self.auth.as_ref().is_some_and(|auth| auth.pending_rotation)
    }

    /// Whether this session was minted by the current request
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Time elapsed since the last save, zero if never saved
    #[must_use]
    pub fn duration_since_last_update(&self) -> Duration {
        self.updated_at
            .map_or_else(Duration::zero, |updated| Utc::now() - updated)
    }
}

// =============================================================================
// Persistence
// =============================================================================

impl Session {
    /// Write the session to the store, expiring `timeout` from now
    ///
    /// A zero (or negative) `timeout` terminates the session: the entry is written
    /// already expired, so later opens treat it as absent. For auth sessions a
    /// pending rotation is applied here, as is the first stamp of the rotation
    /// clock. In-memory state only changes once the store write succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Codec`] if encoding fails and
    /// [`SessionError::Store`] if the write fails.
    pub fn save(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let now = Utc::now();
        let set = ValueSet {
            values: self.values.clone(),
            updated_at: Some(now),
        };

        let record = match (&self.auth, &self.retained_rotation) {
            (None, None) => SessionRecord::Plain(set),
            (None, Some(retained)) => SessionRecord::WithRotation(set, retained.clone()),
            (Some(auth), _) => {
                let mut rotation = auth.rotation.clone();
                if rotation.rotate_on_save(auth.pending_rotation, now) {
                    debug!("Rotated auth token to generation {}", rotation.counter);
                }
                SessionRecord::WithRotation(set, rotation)
            }
        };

        let data = self.codec.encode(&record)?;
        let terminate = timeout <= Duration::zero();
        let expiry = if terminate {
            now
        } else {
            now.checked_add_signed(timeout)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        };
        self.store
            .add_entry(&self.key, SessionEntry::new(data, expiry))?;

        if terminate {
            info!("Terminated session entry");
        } else {
            debug!("Saved session entry, expires in {}s", timeout.num_seconds());
        }

        let (set, rotation) = record.into_parts();
        self.updated_at = set.updated_at;
        if let (Some(auth), Some(rotation)) = (self.auth.as_mut(), rotation) {
            auth.rotation = rotation;
            auth.pending_rotation = false;
        }
        self.is_new = false;
        Ok(())
    }

    /// Move the session to a new random id, keeping its values
    ///
    /// The rotation secret is untouched. The old entry is left as it is; callers
    /// that want it gone save with a zero timeout first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Randomness`] if the new key cannot be generated.
    pub fn recreate(&mut self) -> Result<Token, SessionError> {
        self.key = generate_session_key()?;
        info!("Recreated session under a new id");
        Ok(self.id_token())
    }
}

// =============================================================================
// Values
// =============================================================================

impl Session {
    /// Store `value` under `key`, replacing whatever was there
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove and return the value under `key`
    pub fn remove_var(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Drop all values; id and rotation state are kept
    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueMap {
        &mut self.values
    }

    /// Last value access error, cleared by the next successful read
    #[must_use]
    pub fn last_error(&self) -> Option<ValueAccessError> {
        self.last_error.borrow().clone()
    }

    /// Raw value under `key`
    pub fn var(&self, key: &str) -> Option<Value> {
        self.read(key, "any", |v| Some(v.clone()))
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn int_var(&self, key: &str) -> i32 {
        self.read(key, "int", |v| match v {
            Value::Float(f) => Some(*f as i32),
            Value::Int(i) => i32::try_from(*i).ok(),
            _ => None,
        })
        .unwrap_or_default()
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn int64_var(&self, key: &str) -> i64 {
        self.read(key, "int64", |v| match v {
            Value::Float(f) => Some(*f as i64),
            Value::Int(i) => Some(*i),
            _ => None,
        })
        .unwrap_or_default()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn uint_var(&self, key: &str) -> u32 {
        self.read(key, "uint", |v| match v {
            Value::Float(f) => Some(*f as u32),
            Value::Uint(u) => u32::try_from(*u).ok(),
            _ => None,
        })
        .unwrap_or_default()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn uint64_var(&self, key: &str) -> u64 {
        self.read(key, "uint64", |v| match v {
            Value::Float(f) => Some(*f as u64),
            Value::Uint(u) => Some(*u),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn float64_var(&self, key: &str) -> f64 {
        self.read(key, "float64", |v| match v {
            Value::Float(f) => Some(*f),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn bool_var(&self, key: &str) -> bool {
        self.read(key, "bool", |v| match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn string_var(&self, key: &str) -> String {
        self.read(key, "string", |v| match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
    }

    /// Look up `key` and convert it, recording the outcome on the error slot
    fn read<T>(
        &self,
        key: &str,
        expected: &'static str,
        convert: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        let outcome = match self.values.get(key) {
            None => Err(ValueAccessError::MissingValue {
                key: key.to_string(),
            }),
            Some(value) => convert(value).ok_or_else(|| ValueAccessError::TypeMismatch {
                key: key.to_string(),
                expected,
                found: value.type_name(),
            }),
        };
        match outcome {
            Ok(v) => {
                self.last_error.replace(None);
                Some(v)
            }
            Err(e) => {
                self.last_error.replace(Some(e));
                None
            }
        }
    }
}
