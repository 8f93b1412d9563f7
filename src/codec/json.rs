//! Textual JSON codec
//!
//! Entries are stored as a JSON object:
//!
//! ```json
//! {"values": {"counter": 1}, "updated_at": "2024-01-01T00:00:00Z", "rotation": {...}}
//! ```
//!
//! Values decode without type information, so `counter` above comes back as
//! `Value::Float(1.0)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{assemble_record, CodecError, RecordKind, SessionCodec, SessionRecord, ValueSet};
use crate::rotation::RotationState;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    values: serde_json::Map<String, serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<&'a RotationState>,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    values: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    rotation: Option<serde_json::Value>,
}

impl SessionCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError> {
        let set = record.value_set();
        let envelope = EnvelopeOut {
            values: set
                .values
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                .collect(),
            updated_at: set.updated_at,
            rotation: record.rotation(),
        };
        serde_json::to_vec(&envelope).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8], kind: RecordKind) -> Result<SessionRecord, CodecError> {
        let envelope: EnvelopeIn =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Envelope(e.to_string()))?;

        let set = ValueSet {
            values: envelope
                .values
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
            updated_at: envelope.updated_at,
        };
        let rotation = envelope.rotation.map(|raw| {
            move || serde_json::from_value::<RotationState>(raw).map_err(|e| e.to_string())
        });
        assemble_record(set, rotation, kind)
    }
}
