//! Registry record types: who a client is and how to reach them.

use std::fmt;
use std::sync::Arc;

use chatrelay_protocol::WireMessage;
use chatrelay_transport::ConnectionId;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of simultaneously registered clients. Must be ≥ 1.
    pub max_clients: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_clients: 5 }
    }
}

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// Identifier assigned to a client when it joins.
///
/// Ids count up from 1 and are never reused within one registry, even
/// after the client leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ConnectionHandle
// ---------------------------------------------------------------------------

/// Default number of messages a connection's outbound queue holds before
/// the peer is considered stalled.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

/// Sending side of a connection's outbound queue.
pub type PeerSender = mpsc::Sender<WireMessage>;
/// Receiving side of a connection's outbound queue, drained by the
/// connection's writer task.
pub type PeerReceiver = mpsc::Receiver<WireMessage>;

/// A non-owning handle to a live connection.
///
/// The connection's own task owns the socket. The registry only keeps
/// this handle, which can identify the connection and queue messages for
/// its writer, but cannot close it or keep it alive. Once the connection
/// task exits, [`deliver`](Self::deliver) simply returns `false`.
///
/// The queue is bounded. When it fills up the message is dropped and the
/// owning task is woken through [`overflowed`](Self::overflowed), so it
/// can disconnect the peer instead of buffering without limit.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: PeerSender,
    overflow: Arc<Notify>,
}

impl ConnectionHandle {
    /// Creates a handle together with the queue its writer task drains,
    /// using [`DEFAULT_OUTBOUND_CAPACITY`].
    pub fn channel(id: ConnectionId) -> (Self, PeerReceiver) {
        Self::with_capacity(id, DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Like [`channel`](Self::channel) with an explicit queue size.
    /// A capacity of 0 is raised to 1.
    pub fn with_capacity(id: ConnectionId, capacity: usize) -> (Self, PeerReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id,
            outbound: tx,
            overflow: Arc::new(Notify::new()),
        };
        (handle, rx)
    }

    /// The connection this handle points at.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a message for the connection's writer.
    ///
    /// Never blocks. Returns `false` if the writer has gone away or the
    /// queue is full; in the latter case [`overflowed`](Self::overflowed)
    /// fires.
    pub fn deliver(&self, msg: WireMessage) -> bool {
        match self.outbound.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "outbound queue full, message dropped");
                self.overflow.notify_one();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Resolves once a [`deliver`](Self::deliver) has found the queue full.
    ///
    /// An overflow that happens before this is awaited is not lost.
    pub async fn overflowed(&self) {
        self.overflow.notified().await;
    }

    /// Returns `true` once the writer side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

// ---------------------------------------------------------------------------
// ClientRecord
// ---------------------------------------------------------------------------

/// One registered client.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Registry-assigned id.
    pub id: ClientId,

    /// Unique among currently registered clients.
    pub nickname: String,

    /// Address the client announced in its `join` message, exactly as
    /// sent. Self-reported and not necessarily the socket's peer address.
    pub announced_address: Value,

    /// Port the client announced in its `join` message, exactly as sent.
    pub announced_port: Value,

    /// How to reach the client.
    pub handle: ConnectionHandle,
}

impl ClientRecord {
    /// The connection this client is registered on.
    pub fn connection_id(&self) -> ConnectionId {
        self.handle.id()
    }
}
