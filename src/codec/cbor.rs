//! Binary CBOR codec
//!
//! Values are written with their variant tag, so an `Int` stays an `Int` and a
//! `Uint` stays a `Uint` across a save and reload. The rotation payload is kept as
//! a raw CBOR value during the first pass and deserialized in the second.

use chrono::{DateTime, Utc};
use ciborium::value::Value as CborValue;
use serde::{Deserialize, Serialize};

use super::{assemble_record, CodecError, RecordKind, SessionCodec, SessionRecord, ValueSet};
use crate::rotation::RotationState;
use crate::value::ValueMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    values: &'a ValueMap,
    updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<&'a RotationState>,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    values: ValueMap,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    rotation: Option<CborValue>,
}

impl SessionCodec for CborCodec {
    fn name(&self) -> &'static str {
        "cbor"
    }

    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError> {
        let set = record.value_set();
        let envelope = EnvelopeOut {
            values: &set.values,
            updated_at: set.updated_at,
            rotation: record.rotation(),
        };
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&envelope, &mut buf)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8], kind: RecordKind) -> Result<SessionRecord, CodecError> {
        let envelope: EnvelopeIn =
            ciborium::de::from_reader(bytes).map_err(|e| CodecError::Envelope(e.to_string()))?;

        let set = ValueSet {
            values: envelope.values,
            updated_at: envelope.updated_at,
        };
        let rotation = envelope
            .rotation
            .map(|raw| move || raw.deserialized::<RotationState>().map_err(|e| e.to_string()));
        assemble_record(set, rotation, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_values_keep_concrete_types() {
        let mut values = ValueMap::new();
        values.insert("i".to_string(), Value::Int(-4));
        values.insert("u".to_string(), Value::Uint(9));
        values.insert("f".to_string(), Value::Float(2.5));
        values.insert("s".to_string(), Value::from("x"));
        values.insert("l".to_string(), Value::from(vec![1u8, 2]));
        let record = SessionRecord::Plain(ValueSet {
            values: values.clone(),
            updated_at: None,
        });

        let bytes = CborCodec.encode(&record).unwrap();
        let decoded = CborCodec.decode(&bytes, RecordKind::Plain).unwrap();
        assert_eq!(decoded.value_set().values, values);
    }

    #[test]
    fn test_rotation_two_pass() {
        let state = RotationState {
            secret: "secret".into(),
            counter: 7,
            rotation_start: Some(Utc::now()),
        };
        let record = SessionRecord::WithRotation(ValueSet::default(), state.clone());
        let bytes = CborCodec.encode(&record).unwrap();

        let decoded = CborCodec.decode(&bytes, RecordKind::WithRotation).unwrap();
        assert_eq!(decoded.rotation(), Some(&state));

        let plain = CborCodec.decode(&bytes, RecordKind::Plain).unwrap();
        assert!(plain.rotation().is_none());
    }

    #[test]
    fn test_garbage_is_envelope_error() {
        let err = CborCodec
            .decode(&[0xff, 0x00, 0x13], RecordKind::Plain)
            .unwrap_err();
        assert!(matches!(err, CodecError::Envelope(_)));
    }

    #[test]
    fn test_plain_entry_has_no_rotation() {
        let record = SessionRecord::Plain(ValueSet::default());
        let bytes = CborCodec.encode(&record).unwrap();
        let err = CborCodec
            .decode(&bytes, RecordKind::WithRotation)
            .unwrap_err();
        assert!(matches!(err, CodecError::Rotation(_)));
    }
}
