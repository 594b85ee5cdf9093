//! Error types for the protocol layer.
//!
//! Two separate enums, because the two kinds of failure are handled very
//! differently by the relay:
//!
//! - [`ProtocolError`]: the bytes themselves are bad (or the sink is).
//!   The connection that produced them is closed.
//! - [`ValidationError`]: the frame decoded fine but the message has the
//!   wrong shape. The message is dropped and the connection stays open.

use crate::MessageKind;

/// Errors that can occur while encoding, decoding or framing messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a value into canonical JSON).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload was valid base64 but not a JSON object.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame could not be recovered from the byte stream
    /// (bad base64, a delimiter inside a payload, EOF mid-frame).
    #[error("malformed frame: {0}")]
    Framing(String),

    /// A frame grew past the configured limit without a delimiter.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLong { len: usize, max: usize },

    /// The underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns `true` for malformed input (a protocol violation by the
    /// peer), as opposed to encoding or transport failures.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::Framing(_) | Self::FrameTooLong { .. }
        )
    }

    /// Returns `true` when serializing an outbound message failed.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encode(_))
    }
}

/// A well-framed message that does not match any expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The message has no `option` key.
    #[error("message has no \"option\" key")]
    MissingOption,

    /// The `option` value is not one of the known kinds.
    #[error("unknown option {0:?}")]
    UnknownOption(String),

    /// A key required for this kind of message is absent.
    #[error("{kind} message is missing required key {field:?}")]
    MissingField {
        kind: MessageKind,
        field: &'static str,
    },

    /// A key is present but holds the wrong JSON type or range.
    #[error("key {field:?} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}
