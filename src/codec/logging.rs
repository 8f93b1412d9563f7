//! Codec decorator that logs encoded records
//!
//! Useful while debugging a store. Rotation secrets are part of the logged
//! payload, so keep this out of production configurations.

use log::debug;

use super::{CodecError, RecordKind, SessionCodec, SessionRecord};

#[derive(Debug, Clone, Default)]
pub struct LoggingCodec<C> {
    inner: C,
}

impl<C: SessionCodec> LoggingCodec<C> {
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: SessionCodec> SessionCodec for LoggingCodec<C> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError> {
        let bytes = self.inner.encode(record)?;
        match serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|doc| serde_json::to_string_pretty(&doc).ok())
        {
            Some(pretty) => debug!("encoding {pretty}"),
            None => debug!("encoding {} bytes with {}", bytes.len(), self.inner.name()),
        }
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8], kind: RecordKind) -> Result<SessionRecord, CodecError> {
        self.inner.decode(bytes, kind)
    }
}
