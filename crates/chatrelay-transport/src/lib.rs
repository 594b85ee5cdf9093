//! Transport abstraction layer for chatrelay.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! byte-stream transports. The relay only needs an ordered, bidirectional
//! stream per client; framing happens one layer up, in the protocol crate.
//!
//! # Feature Flags
//!
//! - `tcp` (default): plain TCP transport via `tokio::net`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};

/// Opaque identifier for a connection.
///
/// Unique for the lifetime of the process; never reused after the
/// connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;

    /// Stops accepting connections and releases the listening socket.
    ///
    /// Connections already accepted are unaffected. Afterwards `accept`
    /// and `local_addr` fail; calling `shutdown` again is a no-op.
    async fn shutdown(&mut self) -> Result<(), Self::Error>;
}

/// A single accepted connection: an ordered byte stream in each direction.
///
/// The connection is consumed by [`into_split`](Connection::into_split)
/// so that exactly one task owns the read side and one owns the write
/// side. Dropping both halves closes the connection.
pub trait Connection: Send + 'static {
    /// The read half of the stream.
    type Reader: AsyncRead + Send + Unpin + 'static;
    /// The write half of the stream.
    type Writer: AsyncWrite + Send + Unpin + 'static;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the observed address of the remote peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Splits the connection into independently owned halves.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}
