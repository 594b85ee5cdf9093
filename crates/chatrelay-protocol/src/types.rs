//! Message types for chatrelay's wire format.
//!
//! On the wire every message is an untyped JSON object with a mandatory
//! `option` discriminator ([`WireMessage`]). The relay never trusts that
//! shape: [`ChatMessage::parse`] validates a `WireMessage` into one of the
//! three known variants, or explains why it can't.
//!
//! Validation is about presence. Apart from `option` and `nick`, which the
//! relay keys on, values are carried through as whatever JSON the client
//! sent.
//!
//! | option       | required keys        |
//! |--------------|----------------------|
//! | `join`       | `nick`, `ip`, `port` |
//! | `message`    | `nick`, `message`    |
//! | `disconnect` | `nick`               |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ValidationError;

/// The discriminator key present in every message.
pub const OPTION_KEY: &str = "option";

/// Longest nickname a client announces; longer ones are truncated by the
/// client before joining.
pub const NICK_MAX_CHARS: usize = 20;

// ---------------------------------------------------------------------------
// WireMessage
// ---------------------------------------------------------------------------

/// An untyped message exactly as it travels on the wire.
///
/// Keys keep their insertion order, so a message that is decoded and
/// re-encoded comes out with the same layout. Relayed messages are passed
/// through as `WireMessage`s, which keeps any extra keys a client sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireMessage(Map<String, Value>);

impl WireMessage {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the `option` value if it is present and a string.
    pub fn option(&self) -> Option<&str> {
        self.0.get(OPTION_KEY).and_then(Value::as_str)
    }

}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Compact JSON is the most useful form in log lines.
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<unprintable>"),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The recognized values of the `option` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A client announces its identity.
    Join,
    /// Chat text from a registered client.
    Message,
    /// Server-synthesized notice that a client left.
    Disconnect,
}

impl MessageKind {
    /// The string used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Message => "message",
            Self::Disconnect => "disconnect",
        }
    }

    /// Keys that must be present for this kind, in validation order.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Join => &["nick", "ip", "port"],
            Self::Message => &["message", "nick"],
            Self::Disconnect => &["nick"],
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(Self::Join),
            "message" => Ok(Self::Message),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(ValidationError::UnknownOption(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// A validated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    /// `{"option": "join", "nick", "ip", "port"}`.
    ///
    /// `ip` and `port` are whatever the client self-reports, which need
    /// not match the socket's observed peer address. They are kept as
    /// received so they can be echoed back verbatim.
    Join { nick: String, ip: Value, port: Value },

    /// `{"option": "message", "nick", "message"}`. The text is relayed
    /// as received, whatever its JSON type.
    Message { nick: String, message: Value },

    /// `{"option": "disconnect", "nick"}`.
    Disconnect { nick: String },
}

impl ChatMessage {
    /// Validates an untyped message.
    ///
    /// Checks run in a fixed order: `option` present, `option` known,
    /// every required key present, then `nick` is a string. Other values
    /// are not inspected.
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] found.
    pub fn parse(wire: &WireMessage) -> Result<Self, ValidationError> {
        let option = match wire.get(OPTION_KEY) {
            None => return Err(ValidationError::MissingOption),
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: OPTION_KEY,
                    expected: "a string",
                })
            }
        };
        let kind: MessageKind = option.parse()?;

        for &field in kind.required_fields() {
            if wire.get(field).is_none() {
                return Err(ValidationError::MissingField { kind, field });
            }
        }

        let nick = nick_field(wire)?;
        match kind {
            MessageKind::Join => Ok(Self::Join {
                nick,
                ip: present_field(wire, "ip"),
                port: present_field(wire, "port"),
            }),
            MessageKind::Message => Ok(Self::Message {
                nick,
                message: present_field(wire, "message"),
            }),
            MessageKind::Disconnect => Ok(Self::Disconnect { nick }),
        }
    }

    /// Which `option` this message carries.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Join { .. } => MessageKind::Join,
            Self::Message { .. } => MessageKind::Message,
            Self::Disconnect { .. } => MessageKind::Disconnect,
        }
    }

    /// The nickname every variant carries.
    pub fn nick(&self) -> &str {
        match self {
            Self::Join { nick, .. }
            | Self::Message { nick, .. }
            | Self::Disconnect { nick } => nick,
        }
    }

    /// Renders the message as a `WireMessage` with `option` first.
    pub fn to_wire(&self) -> WireMessage {
        let wire = WireMessage::new().with(OPTION_KEY, self.kind().as_str());
        match self {
            Self::Join { nick, ip, port } => wire
                .with("nick", nick.as_str())
                .with("ip", ip.clone())
                .with("port", port.clone()),
            Self::Message { nick, message } => wire
                .with("nick", nick.as_str())
                .with("message", message.clone()),
            Self::Disconnect { nick } => wire.with("nick", nick.as_str()),
        }
    }
}

impl From<ChatMessage> for WireMessage {
    fn from(msg: ChatMessage) -> Self {
        msg.to_wire()
    }
}

impl TryFrom<&WireMessage> for ChatMessage {
    type Error = ValidationError;

    fn try_from(wire: &WireMessage) -> Result<Self, Self::Error> {
        Self::parse(wire)
    }
}

/// The nickname is the registry's lookup key, so it has to be a string.
fn nick_field(wire: &WireMessage) -> Result<String, ValidationError> {
    wire.get("nick")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ValidationError::InvalidField {
            field: "nick",
            expected: "a string",
        })
}

/// Copies a key already checked for presence.
fn present_field(wire: &WireMessage, field: &str) -> Value {
    wire.get(field).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(value: serde_json::Value) -> WireMessage {
        serde_json::from_value(value).expect("test value is an object")
    }

    // =====================================================================
    // ChatMessage::parse()
    // =====================================================================

    #[test]
    fn test_parse_join_valid_returns_join() {
        let msg = wire(json!({
            "option": "join", "nick": "alice", "ip": "10.0.0.1", "port": 4000
        }));
        assert_eq!(
            ChatMessage::parse(&msg),
            Ok(ChatMessage::Join {
                nick: "alice".into(),
                ip: json!("10.0.0.1"),
                port: json!(4000),
            })
        );
    }

    #[test]
    fn test_parse_message_valid_returns_message() {
        let msg = wire(json!({"option": "message", "nick": "bob", "message": "hi"}));
        let parsed = ChatMessage::parse(&msg).unwrap();
        assert_eq!(parsed.kind(), MessageKind::Message);
        assert_eq!(parsed.nick(), "bob");
    }

    #[test]
    fn test_parse_without_option_returns_missing_option() {
        let msg = wire(json!({"nick": "alice"}));
        assert_eq!(ChatMessage::parse(&msg), Err(ValidationError::MissingOption));
    }

    #[test]
    fn test_parse_unknown_option_returns_unknown_option() {
        let msg = wire(json!({"option": "bogus", "nick": "alice"}));
        assert_eq!(
            ChatMessage::parse(&msg),
            Err(ValidationError::UnknownOption("bogus".into()))
        );
    }

    #[test]
    fn test_parse_non_string_option_returns_invalid_field() {
        let msg = wire(json!({"option": 7}));
        assert!(matches!(
            ChatMessage::parse(&msg),
            Err(ValidationError::InvalidField { field: "option", .. })
        ));
    }

    #[test]
    fn test_parse_message_missing_text_returns_missing_field() {
        let msg = wire(json!({"option": "message", "nick": "alice"}));
        assert_eq!(
            ChatMessage::parse(&msg),
            Err(ValidationError::MissingField {
                kind: MessageKind::Message,
                field: "message",
            })
        );
    }

    #[test]
    fn test_parse_join_reports_first_missing_key_in_order() {
        let msg = wire(json!({"option": "join", "port": 1}));
        assert_eq!(
            ChatMessage::parse(&msg),
            Err(ValidationError::MissingField {
                kind: MessageKind::Join,
                field: "nick",
            })
        );
    }

    #[test]
    fn test_parse_join_port_as_string_keeps_value() {
        let msg = wire(json!({
            "option": "join", "nick": "a", "ip": "1.2.3.4", "port": "4000"
        }));
        match ChatMessage::parse(&msg) {
            Ok(ChatMessage::Join { port, .. }) => assert_eq!(port, json!("4000")),
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_join_null_values_count_as_present() {
        let msg = wire(json!({"option": "join", "nick": "a", "ip": null, "port": null}));
        assert!(ChatMessage::parse(&msg).is_ok());
    }

    #[test]
    fn test_parse_message_numeric_text_keeps_value() {
        let msg = wire(json!({"option": "message", "nick": "alice", "message": 42}));
        assert_eq!(
            ChatMessage::parse(&msg),
            Ok(ChatMessage::Message {
                nick: "alice".into(),
                message: json!(42),
            })
        );
    }

    #[test]
    fn test_parse_non_string_nick_returns_invalid_field() {
        let msg = wire(json!({"option": "message", "nick": 7, "message": "hi"}));
        assert!(matches!(
            ChatMessage::parse(&msg),
            Err(ValidationError::InvalidField { field: "nick", .. })
        ));
    }

    #[test]
    fn test_parse_ignores_extra_keys() {
        let msg = wire(json!({"option": "disconnect", "nick": "d", "extra": true}));
        assert_eq!(
            ChatMessage::parse(&msg),
            Ok(ChatMessage::Disconnect { nick: "d".into() })
        );
    }

    // =====================================================================
    // to_wire()
    // =====================================================================

    #[test]
    fn test_to_wire_join_orders_keys_option_first() {
        let msg = ChatMessage::Join {
            nick: "alice".into(),
            ip: json!("10.0.0.1"),
            port: json!(4000),
        };
        let value = serde_json::to_value(msg.to_wire()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["option", "nick", "ip", "port"]);
    }

    #[test]
    fn test_to_wire_then_parse_gives_back_message() {
        let msg = ChatMessage::Message {
            nick: "bob".into(),
            message: "hello there".into(),
        };
        assert_eq!(ChatMessage::parse(&msg.to_wire()), Ok(msg));
    }

    // =====================================================================
    // WireMessage / MessageKind
    // =====================================================================

    #[test]
    fn test_wire_message_option_requires_string() {
        assert_eq!(WireMessage::new().with("option", "join").option(), Some("join"));
        assert_eq!(WireMessage::new().with("option", 1).option(), None);
        assert_eq!(WireMessage::new().option(), None);
    }

    #[test]
    fn test_wire_message_display_is_compact_json() {
        let msg = WireMessage::new().with("option", "disconnect").with("nick", "d");
        assert_eq!(msg.to_string(), r#"{"option":"disconnect","nick":"d"}"#);
    }

    #[test]
    fn test_message_kind_from_str_round_trips_as_str() {
        for kind in [MessageKind::Join, MessageKind::Message, MessageKind::Disconnect] {
            assert_eq!(kind.as_str().parse::<MessageKind>(), Ok(kind));
        }
        assert!("JOIN".parse::<MessageKind>().is_err());
    }
}
