//! Wire protocol for chatrelay.
//!
//! This crate defines the "language" that chat clients and the relay speak:
//!
//! - **Types** ([`WireMessage`], [`ChatMessage`], [`MessageKind`]): the
//!   untyped JSON object that travels on the wire, and its validated,
//!   typed view.
//! - **Codec** ([`Codec`] trait, [`Base64JsonCodec`]): how one message is
//!   turned into a text-safe payload and back.
//! - **Framing** ([`FrameCodec`]): how payloads are delimited on a
//!   continuous byte stream, tolerating arbitrary read chunking.
//! - **Errors** ([`ProtocolError`], [`ValidationError`]).
//!
//! # Wire format
//!
//! ```text
//! {"option": "join", "nick": "alice", "ip": "10.0.0.1", "port": 4000}
//!        │ canonical JSON (", " / ": " separators, ASCII-only)
//!        ▼
//! eyJvcHRpb24iOiAiam9pbiIsIC4uLn0=
//!        │ base64 (standard alphabet, padded)
//!        ▼
//! eyJvcHRpb24iOiAiam9pbiIsIC4uLn0=\n
//!                                  └─ frame delimiter
//! ```

mod codec;
mod error;
mod frame;
mod types;

pub use codec::{canonical_json, Base64JsonCodec, Codec};
pub use error::{ProtocolError, ValidationError};
pub use frame::{encode_frame, FrameCodec, DEFAULT_MAX_FRAME_LEN, FRAME_DELIMITER};
pub use types::{ChatMessage, MessageKind, WireMessage, NICK_MAX_CHARS, OPTION_KEY};
