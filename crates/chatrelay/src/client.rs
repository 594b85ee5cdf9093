//! A minimal chat client speaking the relay's wire protocol.
//!
//! [`ChatClient`] connects, announces itself with a `join`, and then turns
//! the relay's traffic into [`ClientEvent`]s while tracking who is online.

use std::fmt;
use std::net::SocketAddr;

use chatrelay_protocol::{ChatMessage, FrameCodec, WireMessage, NICK_MAX_CHARS};
use chatrelay_transport::TransportError;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::RelayError;

/// Something that happened in the chat, as seen by this client.
///
/// Announced addresses and message bodies are whatever JSON the sending
/// client put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A peer is online. Sent once per existing peer right after joining,
    /// then once for every newcomer.
    Joined { nick: String, ip: Value, port: Value },

    /// A peer said something.
    Message { nick: String, message: Value },

    /// A peer went away.
    Left { nick: String },
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined { nick, .. } => write!(f, "* {nick} joined"),
            Self::Message { nick, message: Value::String(text) } => write!(f, "{nick}: {text}"),
            Self::Message { nick, message } => write!(f, "{nick}: {message}"),
            Self::Left { nick } => write!(f, "* {nick} left"),
        }
    }
}

/// A peer known to be online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub nick: String,
    pub ip: Value,
    pub port: Value,
}

/// A connected, joined chat client.
pub struct ChatClient {
    nick: String,
    local_addr: SocketAddr,
    frames: Framed<TcpStream, FrameCodec>,
    peers: Vec<Peer>,
}

impl ChatClient {
    /// Connects to a relay at `addr` and joins as `nick`.
    ///
    /// Nicknames longer than 20 characters are truncated. The `join`
    /// announces this side's local socket address.
    ///
    /// # Errors
    /// [`RelayError::Transport`] if the connection fails, or
    /// [`RelayError::Protocol`] if the `join` can't be written.
    pub async fn connect(addr: &str, nick: &str) -> Result<Self, RelayError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = stream
            .local_addr()
            .map_err(TransportError::AddrUnavailable)?;

        let nick: String = nick.chars().take(NICK_MAX_CHARS).collect();
        let mut frames = Framed::new(stream, FrameCodec::new());

        let join = ChatMessage::Join {
            nick: nick.clone(),
            ip: local_addr.ip().to_string().into(),
            port: local_addr.port().into(),
        };
        frames.send(join.to_wire()).await?;
        tracing::debug!(%nick, %local_addr, relay = addr, "joined");

        Ok(Self {
            nick,
            local_addr,
            frames,
            peers: Vec::new(),
        })
    }

    /// The nickname this client joined with, after truncation.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// This side's socket address, as announced in the `join`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Peers currently known to be online, in the order they appeared.
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Sends a chat message to everyone else.
    ///
    /// # Errors
    /// [`RelayError::Protocol`] if the frame can't be written.
    pub async fn send_message(&mut self, text: &str) -> Result<(), RelayError> {
        let msg = ChatMessage::Message {
            nick: self.nick.clone(),
            message: text.into(),
        };
        self.send_raw(msg.to_wire()).await
    }

    /// Sends an arbitrary message, valid or not.
    ///
    /// # Errors
    /// [`RelayError::Protocol`] if the frame can't be written.
    pub async fn send_raw(&mut self, msg: WireMessage) -> Result<(), RelayError> {
        self.frames.send(msg).await?;
        Ok(())
    }

    /// Waits for the next chat event.
    ///
    /// Returns `Ok(None)` once the relay closes the connection. Messages
    /// that don't validate are skipped. Cancel-safe: dropping the future
    /// loses nothing.
    ///
    /// # Errors
    /// [`RelayError::Protocol`] on a framing violation or read failure.
    pub async fn next_event(&mut self) -> Result<Option<ClientEvent>, RelayError> {
        while let Some(frame) = self.frames.next().await {
            let wire = frame?;
            match ChatMessage::parse(&wire) {
                Ok(msg) => return Ok(Some(apply(&mut self.peers, msg))),
                Err(e) => tracing::debug!(error = %e, %wire, "ignoring invalid message"),
            }
        }
        Ok(None)
    }
}

/// Updates the roster for one message and turns it into an event.
fn apply(peers: &mut Vec<Peer>, msg: ChatMessage) -> ClientEvent {
    match msg {
        ChatMessage::Join { nick, ip, port } => {
            peers.retain(|p| p.nick != nick);
            peers.push(Peer {
                nick: nick.clone(),
                ip: ip.clone(),
                port: port.clone(),
            });
            ClientEvent::Joined { nick, ip, port }
        }
        ChatMessage::Message { nick, message } => ClientEvent::Message { nick, message },
        ChatMessage::Disconnect { nick } => {
            peers.retain(|p| p.nick != nick);
            ClientEvent::Left { nick }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(nick: &str) -> ChatMessage {
        ChatMessage::Join {
            nick: nick.into(),
            ip: "10.0.0.1".into(),
            port: 4000.into(),
        }
    }

    #[test]
    fn test_apply_join_adds_peer() {
        let mut peers = Vec::new();
        let event = apply(&mut peers, join("alice"));
        assert_eq!(event.to_string(), "* alice joined");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].nick, "alice");
    }

    #[test]
    fn test_apply_disconnect_removes_peer() {
        let mut peers = Vec::new();
        apply(&mut peers, join("alice"));
        apply(&mut peers, join("bob"));

        let event = apply(&mut peers, ChatMessage::Disconnect { nick: "alice".into() });

        assert_eq!(event, ClientEvent::Left { nick: "alice".into() });
        assert_eq!(peers.iter().map(|p| p.nick.as_str()).collect::<Vec<_>>(), ["bob"]);
    }

    #[test]
    fn test_apply_repeated_join_keeps_one_entry() {
        let mut peers = Vec::new();
        apply(&mut peers, join("alice"));
        apply(&mut peers, join("alice"));
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn test_apply_message_leaves_roster_alone() {
        let mut peers = Vec::new();
        apply(&mut peers, join("alice"));
        let event = apply(
            &mut peers,
            ChatMessage::Message {
                nick: "alice".into(),
                message: "hi".into(),
            },
        );
        assert_eq!(event.to_string(), "alice: hi");
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn test_apply_non_string_message_displays_as_json() {
        let mut peers = Vec::new();
        let event = apply(
            &mut peers,
            ChatMessage::Message {
                nick: "alice".into(),
                message: 42.into(),
            },
        );
        assert_eq!(event.to_string(), "alice: 42");
    }
}
