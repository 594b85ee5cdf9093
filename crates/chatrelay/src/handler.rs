//! Per-connection handler: read loop, registry hook-in, and fan-out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Split the connection; spawn a writer task draining the
//!      connection's outbound queue
//!   2. Loop: decode frames → gate on capacity → interpret → fan out
//!   3. On EOF, a framing violation, a writer failure or a full outbound
//!      queue: remove the client from the registry and tell everyone else
//!      it left
//!
//! The handler task is the only owner of the socket. The registry holds a
//! [`ConnectionHandle`] that can queue messages for the writer task, so
//! one stalled peer only ever backs up its own bounded queue, and is
//! dropped once that queue fills.

use std::sync::Arc;

use chatrelay_protocol::{ChatMessage, Codec, FrameCodec, ProtocolError, WireMessage};
use chatrelay_registry::{ClientRecord, ConnectionHandle, PeerReceiver};
use chatrelay_transport::{Connection, ConnectionId};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWrite;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::interpreter::{self, Outcome};
use crate::server::ServerState;
use crate::RelayError;

/// Where a connection is in its lifecycle.
#[derive(Debug)]
enum Phase {
    Unregistered,
    Registered,
}

/// Whether the read loop should keep going after a frame.
enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
///
/// Errors are returned for logging only; by the time this returns the
/// connection's registry entry (if any) is gone and the departure has
/// been broadcast.
pub(crate) async fn handle_connection<T, C>(
    conn: T,
    state: Arc<ServerState<C>>,
) -> Result<(), RelayError>
where
    T: Connection,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    let peer_addr = conn.peer_addr();
    tracing::debug!(%conn_id, %peer_addr, "handling new connection");

    let (reader, writer) = conn.into_split();
    let mut frames = FramedRead::new(reader, state.frame_codec());
    let (handle, outbound) = ConnectionHandle::with_capacity(conn_id, state.outbound_capacity);
    let mut writer_task = tokio::spawn(write_outbound(writer, outbound, state.frame_codec()));

    let mut phase = Phase::Unregistered;

    let result = loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(msg)) => {
                    tracing::trace!(%conn_id, %msg, "frame received");
                    if let Flow::Close = dispatch(&state, &handle, &mut phase, msg).await {
                        break Ok(());
                    }
                }
                Some(Err(e)) if e.is_framing() => {
                    tracing::warn!(%conn_id, %peer_addr, error = %e, "framing violation, closing");
                    break Err(RelayError::Protocol(e));
                }
                Some(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "read failed");
                    break Err(RelayError::Protocol(e));
                }
                None => {
                    tracing::debug!(%conn_id, "connection closed by peer");
                    break Ok(());
                }
            },
            joined = &mut writer_task => {
                match joined {
                    Ok(Err(e)) => tracing::debug!(%conn_id, error = %e, "write failed"),
                    Err(e) => tracing::debug!(%conn_id, error = %e, "writer task ended"),
                    Ok(Ok(())) => {}
                }
                break Ok(());
            }
            _ = handle.overflowed() => {
                tracing::warn!(
                    %conn_id,
                    %peer_addr,
                    capacity = state.outbound_capacity,
                    "outbound queue full, dropping slow peer"
                );
                break Ok(());
            }
        }
    };

    teardown(&state, conn_id).await;
    writer_task.abort();
    result
}

/// Runs one decoded message through the capacity gate and the interpreter.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    handle: &ConnectionHandle,
    phase: &mut Phase,
    msg: WireMessage,
) -> Flow {
    let conn_id = handle.id();
    let mut registry = state.registry.lock().await;

    let outcome = match phase {
        Phase::Unregistered => {
            if registry.is_full() {
                tracing::warn!(
                    %conn_id,
                    max_clients = registry.max_clients(),
                    "registry full, refusing connection"
                );
                return Flow::Close;
            }
            interpreter::handle_unregistered(&mut registry, handle, msg)
        }
        Phase::Registered => interpreter::handle_registered(&registry, msg),
    };

    match &outcome {
        Outcome::Dropped(reason) => {
            tracing::debug!(%conn_id, %reason, "message dropped");
            return Flow::Continue;
        }
        Outcome::Joined { client_id, nick, .. } => {
            tracing::info!(%conn_id, %client_id, nick = %nick, "client joined");
            *phase = Phase::Registered;
        }
        Outcome::Relay(_) => {}
    }

    // Queueing never blocks, so delivering under the lock is cheap and
    // keeps every peer's view consistent with registration order.
    if let Some(msg) = outcome.broadcast() {
        let delivered = fan_out(&registry.snapshot(), Some(conn_id), msg);
        tracing::debug!(%conn_id, option = msg.option(), delivered, "broadcast");
    }
    Flow::Continue
}

/// Removes the connection's client, if any, and announces the departure
/// to every remaining client. Unregistered connections leave silently.
async fn teardown<C: Codec>(state: &ServerState<C>, conn_id: ConnectionId) {
    let mut registry = state.registry.lock().await;
    let record = match registry.remove_by_connection(conn_id) {
        Ok(record) => record,
        Err(_) => {
            tracing::debug!(%conn_id, "unregistered connection closed");
            return;
        }
    };

    let notice = ChatMessage::Disconnect {
        nick: record.nickname.clone(),
    }
    .to_wire();
    let delivered = fan_out(&registry.snapshot(), None, &notice);
    drop(registry);

    tracing::info!(
        %conn_id,
        client_id = %record.id,
        nick = %record.nickname,
        notified = delivered,
        "client left"
    );
}

/// Queues `msg` for every client in `peers` except `exclude`.
///
/// Returns how many queues accepted it. A closed or full queue means that
/// peer is on its way out; its own teardown will clean up.
pub(crate) fn fan_out(
    peers: &[ClientRecord],
    exclude: Option<ConnectionId>,
    msg: &WireMessage,
) -> usize {
    peers
        .iter()
        .filter(|peer| Some(peer.connection_id()) != exclude)
        .filter(|peer| peer.handle.deliver(msg.clone()))
        .count()
}

/// Drains a connection's outbound queue onto its socket.
async fn write_outbound<W, C>(
    writer: W,
    mut outbound: PeerReceiver,
    codec: FrameCodec<C>,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Send + Unpin + 'static,
    C: Codec,
{
    let mut sink = FramedWrite::new(writer, codec);
    while let Some(msg) = outbound.recv().await {
        sink.send(msg).await?;
    }
    Ok(())
}
