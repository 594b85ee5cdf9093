//! Message interpreter: decides what each inbound message means.
//!
//! The interpreter owns no state. It looks at one decoded message,
//! consults (and for joins, mutates) the registry, and returns an
//! [`Outcome`] telling the connection handler whether anything needs to
//! be broadcast. It never does network I/O itself and never fails: every
//! rejected message turns into [`Outcome::Dropped`] with the reason, and
//! the connection stays open.
//!
//! Which messages are accepted depends on where the connection is in its
//! lifecycle:
//!
//! | connection   | accepted option | anything else |
//! |--------------|-----------------|---------------|
//! | unregistered | `join`          | dropped       |
//! | registered   | `message`       | dropped       |
//!
//! `disconnect` is never accepted from a client; the relay synthesizes it.

use std::fmt;

use chatrelay_protocol::{ChatMessage, MessageKind, ValidationError, WireMessage};
use chatrelay_registry::{ClientId, ConnectionHandle, Registry, RegistryError};

/// What the handler should do after a message was interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The message was rejected. Nothing is sent and the connection
    /// stays open.
    Dropped(DropReason),

    /// The sender is now registered. `announcement` goes to every other
    /// registered client.
    Joined {
        client_id: ClientId,
        nick: String,
        announcement: WireMessage,
    },

    /// Relay `0` to every registered client except the sender.
    Relay(WireMessage),
}

impl Outcome {
    /// The message to broadcast to everyone but the sender, if any.
    pub fn broadcast(&self) -> Option<&WireMessage> {
        match self {
            Self::Dropped(_) => None,
            Self::Joined { announcement, .. } => Some(announcement),
            Self::Relay(msg) => Some(msg),
        }
    }
}

/// Why a message was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// The message is missing `option` or a required key, or its `option`
    /// or `nick` is not a string.
    Invalid(ValidationError),

    /// A well-formed message of a kind not accepted in this state,
    /// e.g. a second `join` from a registered client.
    Unexpected(MessageKind),

    /// A `join` for a nickname that is already registered.
    DuplicateNick(String),

    /// A `message` whose `nick` matches no registered client.
    UnknownSender(String),

    /// The registry refused the registration.
    Rejected(RegistryError),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "invalid message: {e}"),
            Self::Unexpected(kind) => write!(f, "unexpected {kind} message"),
            Self::DuplicateNick(nick) => write!(f, "nickname {nick:?} already registered"),
            Self::UnknownSender(nick) => write!(f, "sender {nick:?} is not registered"),
            Self::Rejected(e) => write!(f, "registration rejected: {e}"),
        }
    }
}

/// Interprets a message from a connection that has not joined yet.
///
/// On a valid `join` for a free nickname, this first queues one synthetic
/// `join` per already-registered client on the newcomer's own handle (in
/// registry order), then registers the newcomer, and finally returns the
/// original message as the announcement for everyone else. Queuing the
/// roster before registering guarantees it reaches the newcomer before
/// any broadcast can.
///
/// The caller must hold the registry lock for the whole call and must
/// already have checked capacity.
pub fn handle_unregistered(
    registry: &mut Registry,
    handle: &ConnectionHandle,
    msg: WireMessage,
) -> Outcome {
    let (nick, ip, port) = match ChatMessage::parse(&msg) {
        Ok(ChatMessage::Join { nick, ip, port }) => (nick, ip, port),
        Ok(other) => return Outcome::Dropped(DropReason::Unexpected(other.kind())),
        Err(e) => return Outcome::Dropped(DropReason::Invalid(e)),
    };

    if registry.contains_nick(&nick) {
        return Outcome::Dropped(DropReason::DuplicateNick(nick));
    }

    for peer in registry.snapshot() {
        let roster_entry = ChatMessage::Join {
            nick: peer.nickname,
            ip: peer.announced_address,
            port: peer.announced_port,
        };
        handle.deliver(roster_entry.to_wire());
    }

    match registry.register(&nick, ip, port, handle.clone()) {
        Ok(client_id) => Outcome::Joined {
            client_id,
            nick,
            announcement: msg,
        },
        Err(e) => Outcome::Dropped(DropReason::Rejected(e)),
    }
}

/// Interprets a message from a registered connection.
///
/// A valid `message` whose `nick` belongs to a registered client is
/// relayed unchanged.
pub fn handle_registered(registry: &Registry, msg: WireMessage) -> Outcome {
    match ChatMessage::parse(&msg) {
        Ok(ChatMessage::Message { nick, .. }) => match registry.find_by_nick(&nick) {
            Some(sender) => {
                tracing::trace!(client_id = %sender.id, nick, "relaying message");
                Outcome::Relay(msg)
            }
            None => Outcome::Dropped(DropReason::UnknownSender(nick)),
        },
        Ok(other) => Outcome::Dropped(DropReason::Unexpected(other.kind())),
        Err(e) => Outcome::Dropped(DropReason::Invalid(e)),
    }
}
