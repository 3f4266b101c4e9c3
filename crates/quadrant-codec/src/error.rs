use quadrant_core::error::CoreError;
use thiserror::Error;

/// Errors returned by node, identifier, header and share codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR serialization failure.
    #[error("encode error: {0}")]
    Encode(String),
    /// CBOR deserialization failure.
    #[error("decode error: {0}")]
    Decode(String),
    /// Truncated or inconsistent node bytes.
    #[error("malformed node: {0}")]
    Format(&'static str),
    /// Leading byte is neither the leaf nor the inner marker.
    #[error("unknown node type marker {0:#04x}")]
    UnknownMarker(u8),
    /// Content identifier with the wrong codec, hash code or digest width.
    #[error("invalid cid: {0}")]
    InvalidCid(String),
    /// Node bytes do not hash to the identifier they were fetched under.
    #[error("node bytes do not hash to {expected}")]
    DigestMismatch { expected: String },
    /// Header schema validation failure.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
    /// Share or message layout failure.
    #[error("invalid share: {0}")]
    InvalidShare(&'static str),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CodecError {
    /// True for errors caused by malformed node bytes or identifiers.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Self::Format(_)
                | Self::UnknownMarker(_)
                | Self::InvalidCid(_)
                | Self::DigestMismatch { .. }
                | Self::Core(_)
        )
    }
}
