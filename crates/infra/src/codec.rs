//! Script metadata (de)serialization.

use jobrec_core::ScriptMetadata;
use thiserror::Error;

/// Codec failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("metadata encoding failed: {0}")]
    Encode(String),

    #[error("metadata decoding failed: {0}")]
    Decode(String),
}

/// Turns `ScriptMetadata` into bytes and back. Implementations must round-trip.
pub trait MetadataCodec: Send + Sync {
    fn encode(&self, metadata: &ScriptMetadata) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<ScriptMetadata, CodecError>;
}

/// JSON codec (`serde_json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MetadataCodec for JsonCodec {
    fn encode(&self, metadata: &ScriptMetadata) -> Result<Vec<u8>, CodecError> {
        if let Some(key) = metadata.reserved_extra_key() {
            return Err(CodecError::Encode(format!(
                "extra key `{key}` would duplicate a typed field"
            )));
        }
        serde_json::to_vec(metadata).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ScriptMetadata, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
