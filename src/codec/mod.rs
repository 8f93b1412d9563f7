//! Session record encoding
//!
//! A stored entry is an envelope holding the user values, the time of the last
//! save, and for auth sessions the nested [`RotationState`] under the fixed
//! `rotation` field. Neither side knows the other's shape: decoding is two-pass,
//! first the envelope, then (only when asked for) the nested rotation payload with
//! its own schema. A broken rotation payload therefore surfaces as its own
//! [`CodecError::Rotation`], distinct from a broken envelope.
//!
//! # Codecs
//!
//! - [`JsonCodec`] - textual, values come back untyped (numbers as floats)
//! - [`CborCodec`] - binary, values keep their concrete types (feature `cbor`)
//! - [`LoggingCodec`] - wraps another codec and logs every encoded record

#[cfg(feature = "cbor")]
pub mod cbor;
pub mod json;
pub mod logging;

#[cfg(feature = "cbor")]
pub use cbor::CborCodec;
pub use json::JsonCodec;
pub use logging::LoggingCodec;

use chrono::{DateTime, Utc};

use crate::rotation::RotationState;
use crate::value::ValueMap;

/// Name of the envelope field carrying the nested rotation payload
pub const ROTATION_FIELD: &str = "rotation";

/// Errors produced while encoding or decoding a record
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode session record: {0}")]
    Encode(String),
    /// The bytes are not a readable envelope
    #[error("failed to decode session envelope: {0}")]
    Envelope(String),
    /// The envelope is fine but the nested rotation state is missing or malformed
    #[error("failed to decode rotation state: {0}")]
    Rotation(String),
}

/// User values plus the time they were last saved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSet {
    pub values: ValueMap,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Decoded content of a session entry
#[derive(Debug, Clone, PartialEq)]
pub enum SessionRecord {
    Plain(ValueSet),
    WithRotation(ValueSet, RotationState),
}

impl SessionRecord {
    #[must_use]
    pub fn value_set(&self) -> &ValueSet {
        match self {
            SessionRecord::Plain(set) | SessionRecord::WithRotation(set, _) => set,
        }
    }

    #[must_use]
    pub fn rotation(&self) -> Option<&RotationState> {
        match self {
            SessionRecord::Plain(_) => None,
            SessionRecord::WithRotation(_, rotation) => Some(rotation),
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (ValueSet, Option<RotationState>) {
        match self {
            SessionRecord::Plain(set) => (set, None),
            SessionRecord::WithRotation(set, rotation) => (set, Some(rotation)),
        }
    }
}

/// Which record shape the caller expects back from [`SessionCodec::decode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Decode the envelope only; a nested rotation payload is ignored
    Plain,
    /// Decode the envelope and then the nested rotation payload
    WithRotation,
}

/// Serialization boundary between sessions and the entry store
pub trait SessionCodec: Send + Sync {
    /// Codec name for logging and configuration
    fn name(&self) -> &'static str;

    /// Encode a record into the bytes the store persists
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError>;

    /// Decode stored bytes into a record of the requested kind
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Envelope`] for unreadable bytes and
    /// [`CodecError::Rotation`] when `kind` is [`RecordKind::WithRotation`] and the
    /// nested payload is missing or malformed.
    fn decode(&self, bytes: &[u8], kind: RecordKind) -> Result<SessionRecord, CodecError>;
}

impl<C: SessionCodec + ?Sized> SessionCodec for std::sync::Arc<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError> {
        (**self).encode(record)
    }

    fn decode(&self, bytes: &[u8], kind: RecordKind) -> Result<SessionRecord, CodecError> {
        (**self).decode(bytes, kind)
    }
}

/// Second decoding pass shared by the codecs
///
/// `rotation` is `None` when the envelope has no rotation field; otherwise it
/// decodes the nested payload on demand.
pub(crate) fn assemble_record<F>(
    set: ValueSet,
    rotation: Option<F>,
    kind: RecordKind,
) -> Result<SessionRecord, CodecError>
where
    F: FnOnce() -> Result<RotationState, String>,
{
    match kind {
        RecordKind::Plain => Ok(SessionRecord::Plain(set)),
        RecordKind::WithRotation => {
            let decode = rotation.ok_or_else(|| {
                CodecError::Rotation(format!("envelope has no {ROTATION_FIELD} field"))
            })?;
            let state = decode().map_err(CodecError::Rotation)?;
            Ok(SessionRecord::WithRotation(set, state))
        }
    }
}

/// Look up a codec by its configuration name
#[must_use]
pub fn codec_by_name(name: &str) -> Option<std::sync::Arc<dyn SessionCodec>> {
    match name {
        "json" => Some(std::sync::Arc::new(JsonCodec)),
        #[cfg(feature = "cbor")]
        "cbor" => Some(std::sync::Arc::new(CborCodec)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation() -> RotationState {
        RotationState {
            secret: "s".to_string(),
            counter: 4,
            rotation_start: None,
        }
    }

    #[test]
    fn test_assemble_plain_ignores_rotation() {
        let record = assemble_record(
            ValueSet::default(),
            Some(|| Err::<RotationState, _>("broken".to_string())),
            RecordKind::Plain,
        )
        .unwrap();
        assert_eq!(record, SessionRecord::Plain(ValueSet::default()));
    }

    #[test]
    fn test_assemble_with_rotation_missing_field() {
        let err = assemble_record(
            ValueSet::default(),
            None::<fn() -> Result<RotationState, String>>,
            RecordKind::WithRotation,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::Rotation(_)));
    }

    #[test]
    fn test_assemble_with_rotation() {
        let record = assemble_record(
            ValueSet::default(),
            Some(|| Ok(rotation())),
            RecordKind::WithRotation,
        )
        .unwrap();
        assert_eq!(record.rotation(), Some(&rotation()));
        let (set, state) = record.into_parts();
        assert!(set.values.is_empty());
        assert_eq!(state.unwrap().counter, 4);
    }

    #[test]
    fn test_codec_by_name() {
        assert_eq!(codec_by_name("json").unwrap().name(), "json");
        assert!(codec_by_name("xml").is_none());
    }
}
