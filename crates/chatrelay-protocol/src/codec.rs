//! Codec trait and the default text-safe JSON codec.
//!
//! A [`Codec`] turns one value into one self-contained payload and back.
//! It knows nothing about streams; [`FrameCodec`](crate::FrameCodec)
//! handles delimiting payloads on a byte stream. The one rule a codec must
//! follow is that its payloads never contain the frame delimiter.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::Formatter;

use crate::ProtocolError;

/// A codec that can encode values to payload bytes and decode them back.
///
/// `Send + Sync + 'static` so a single codec value can be shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a payload back into a value.
    ///
    /// # Errors
    /// Returns a framing-class [`ProtocolError`] if the bytes are malformed.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Base64JsonCodec
// ---------------------------------------------------------------------------

/// The relay's wire codec: canonical JSON wrapped in standard base64.
///
/// Base64 keeps every payload inside a safe character set, so a newline
/// can never appear inside a frame no matter what the chat text contains.
///
/// ```rust
/// use chatrelay_protocol::{Base64JsonCodec, Codec, WireMessage};
///
/// let msg = WireMessage::new().with("key1", 1).with("key2", "value2");
/// let bytes = Base64JsonCodec.encode(&msg).unwrap();
/// assert_eq!(bytes, b"eyJrZXkxIjogMSwgImtleTIiOiAidmFsdWUyIn0=");
///
/// let decoded: WireMessage = Base64JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64JsonCodec;

impl Codec for Base64JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        let json = canonical_json(value)?;
        Ok(STANDARD.encode(json).into_bytes())
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        let json = STANDARD
            .decode(data)
            .map_err(|e| ProtocolError::Framing(format!("invalid base64: {e}")))?;
        serde_json::from_slice(&json).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Canonical JSON
// ---------------------------------------------------------------------------

/// Serializes a value to the canonical text form used on the wire.
///
/// Items are separated by `", "`, keys from values by `": "`, and every
/// non-ASCII character is written as a `\uXXXX` escape (a surrogate pair
/// for characters outside the BMP). Clients built against the reference
/// encoder produce exactly these bytes.
///
/// # Errors
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedAsciiFormatter);
    value.serialize(&mut ser).map_err(ProtocolError::Encode)?;
    Ok(out)
}

/// `serde_json` formatter producing the canonical text form.
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMessage, WireMessage};
    use serde_json::json;

    fn canonical(value: serde_json::Value) -> String {
        String::from_utf8(canonical_json(&value).unwrap()).unwrap()
    }

    // =====================================================================
    // canonical_json()
    // =====================================================================

    #[test]
    fn test_canonical_json_uses_spaced_separators() {
        let msg = WireMessage::new().with("key1", 1).with("key2", "value2");
        let text = String::from_utf8(canonical_json(&msg).unwrap()).unwrap();
        assert_eq!(text, r#"{"key1": 1, "key2": "value2"}"#);
    }

    #[test]
    fn test_canonical_json_spaces_arrays_and_nested_objects() {
        assert_eq!(
            canonical(json!({"a": [1, 2, {"b": null}]})),
            r#"{"a": [1, 2, {"b": null}]}"#
        );
    }

    #[test]
    fn test_canonical_json_empty_containers() {
        assert_eq!(canonical(json!({"a": {}, "b": []})), r#"{"a": {}, "b": []}"#);
    }

    #[test]
    fn test_canonical_json_escapes_non_ascii() {
        assert_eq!(canonical(json!({"m": "café"})), r#"{"m": "caf\u00e9"}"#);
    }

    #[test]
    fn test_canonical_json_escapes_astral_as_surrogate_pair() {
        assert_eq!(canonical(json!({"m": "😀"})), r#"{"m": "\ud83d\ude00"}"#);
    }

    #[test]
    fn test_canonical_json_keeps_standard_escapes() {
        assert_eq!(
            canonical(json!({"m": "a\"b\\c\nd"})),
            r#"{"m": "a\"b\\c\nd"}"#
        );
    }

    // =====================================================================
    // Base64JsonCodec
    // =====================================================================

    #[test]
    fn test_encode_matches_reference_bytes() {
        let msg = WireMessage::new().with("key1", 1).with("key2", "value2");
        let bytes = Base64JsonCodec.encode(&msg).unwrap();
        assert_eq!(bytes, b"eyJrZXkxIjogMSwgImtleTIiOiAidmFsdWUyIn0=");
    }

    #[test]
    fn test_decode_reference_bytes() {
        let decoded: WireMessage = Base64JsonCodec
            .decode(b"eyJrZXkxIjogMSwgImtleTIiOiAidmFsdWUyIn0=")
            .unwrap();
        assert_eq!(decoded.get("key1"), Some(&json!(1)));
        assert_eq!(decoded.get("key2"), Some(&json!("value2")));
    }

    #[test]
    fn test_decode_recovers_non_ascii_text() {
        let msg = ChatMessage::Message {
            nick: "zoë".into(),
            message: "olá 👋".into(),
        }
        .to_wire();
        let bytes = Base64JsonCodec.encode(&msg).unwrap();
        assert!(bytes.is_ascii());
        let decoded: WireMessage = Base64JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_invalid_base64_returns_framing_error() {
        let result: Result<WireMessage, _> = Base64JsonCodec.decode(b"not*base64!");
        let err = result.unwrap_err();
        assert!(matches!(err, ProtocolError::Framing(_)));
        assert!(err.is_framing());
    }

    #[test]
    fn test_decode_non_object_json_returns_decode_error() {
        // "[1, 2]" in base64
        let result: Result<WireMessage, _> = Base64JsonCodec.decode(b"WzEsIDJd");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_base64_of_garbage_returns_decode_error() {
        let bytes = STANDARD.encode("this is not json");
        let result: Result<WireMessage, _> = Base64JsonCodec.decode(bytes.as_bytes());
        let err = result.unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.is_framing());
    }
}
