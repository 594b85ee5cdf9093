//! TCP transport implementation using `tokio::net`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A TCP [`Transport`] that listens for incoming connections.
///
/// The listener is released on [`shutdown`](Transport::shutdown) or when
/// the transport is dropped, whichever comes first.
pub struct TcpTransport {
    listener: Option<TcpListener>,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given `host:port` address.
    ///
    /// Port `0` asks the OS for a free port; use
    /// [`local_addr`](Transport::local_addr) to find out which one.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            TransportError::BindFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener: Some(listener),
        })
    }

    fn listener(&self) -> Result<&TcpListener, TransportError> {
        self.listener.as_ref().ok_or(TransportError::Closed)
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, peer_addr) = self
            .listener()?
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        // Chat frames are small; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer_addr, error = %e, "set_nodelay failed");
        }

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer_addr, "accepted TCP connection");

        Ok(TcpConnection {
            id,
            peer_addr,
            stream,
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
        self.listener()?
            .local_addr()
            .map_err(TransportError::AddrUnavailable)
    }

    async fn shutdown(&mut self) -> Result<(), Self::Error> {
        if let Some(listener) = self.listener.take() {
            let addr = listener.local_addr().ok();
            drop(listener);
            tracing::info!(?addr, "TCP transport closed");
        }
        Ok(())
    }
}

/// A single accepted TCP connection.
pub struct TcpConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    stream: TcpStream,
}

impl Connection for TcpConnection {
    type Reader = OwnedReadHalf;
    type Writer = OwnedWriteHalf;

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        self.stream.into_split()
    }
}
