//! Stream framing: one newline-terminated payload per message.
//!
//! [`FrameCodec`] plugs into `tokio_util::codec::{FramedRead, FramedWrite}`.
//! TCP delivers bytes in arbitrary chunks, so the decoder buffers until it
//! sees a delimiter; a message split across ten reads decodes exactly as
//! if it had arrived in one.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Base64JsonCodec, Codec, ProtocolError, WireMessage};

/// Byte that terminates every frame.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Default upper bound on a single frame's payload, in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Encodes `WireMessage`s as delimited frames and decodes them back.
#[derive(Debug, Clone)]
pub struct FrameCodec<C = Base64JsonCodec> {
    codec: C,
    max_frame_len: usize,
    /// Where to resume scanning for a delimiter, so a slowly arriving
    /// frame isn't rescanned from the start on every read.
    next_index: usize,
}

impl FrameCodec<Base64JsonCodec> {
    /// Creates a frame codec over [`Base64JsonCodec`] with the default limit.
    pub fn new() -> Self {
        Self::with_codec(Base64JsonCodec, DEFAULT_MAX_FRAME_LEN)
    }
}

impl Default for FrameCodec<Base64JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> FrameCodec<C> {
    /// Creates a frame codec over any payload codec.
    pub fn with_codec(codec: C, max_frame_len: usize) -> Self {
        Self {
            codec,
            max_frame_len,
            next_index: 0,
        }
    }

    /// The payload size limit this codec enforces when decoding.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl<C: Codec> Decoder for FrameCodec<C> {
    type Item = WireMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<WireMessage>, ProtocolError> {
        loop {
            let found = src[self.next_index..]
                .iter()
                .position(|b| *b == FRAME_DELIMITER);

            let Some(offset) = found else {
                // Allow one extra byte for a trailing '\r'.
                if src.len() > self.max_frame_len + 1 {
                    return Err(ProtocolError::FrameTooLong {
                        len: src.len(),
                        max: self.max_frame_len,
                    });
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;

            let mut line = src.split_to(end + 1);
            line.truncate(end);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }

            if line.len() > self.max_frame_len {
                return Err(ProtocolError::FrameTooLong {
                    len: line.len(),
                    max: self.max_frame_len,
                });
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return self.codec.decode(&line).map(Some);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<WireMessage>, ProtocolError> {
        if let Some(msg) = self.decode(src)? {
            return Ok(Some(msg));
        }
        if src.iter().all(u8::is_ascii_whitespace) {
            src.clear();
            self.next_index = 0;
            return Ok(None);
        }
        Err(ProtocolError::Framing(format!(
            "stream ended inside a frame ({} bytes buffered)",
            src.len()
        )))
    }
}

impl<C: Codec> Encoder<WireMessage> for FrameCodec<C> {
    type Error = ProtocolError;

    fn encode(&mut self, item: WireMessage, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let payload = self.codec.encode(&item)?;
        if payload.contains(&FRAME_DELIMITER) {
            return Err(ProtocolError::Framing(
                "codec produced a payload containing the frame delimiter".into(),
            ));
        }
        dst.reserve(payload.len() + 1);
        dst.put_slice(&payload);
        dst.put_u8(FRAME_DELIMITER);
        Ok(())
    }
}

/// Encodes one message as a complete frame using the default codec.
///
/// # Errors
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_frame(message: &WireMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = BytesMut::new();
    FrameCodec::new().encode(message.clone(), &mut buf)?;
    Ok(buf.to_vec())
}
