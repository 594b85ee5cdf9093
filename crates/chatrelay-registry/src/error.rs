//! Error types for the registry.

use chatrelay_transport::ConnectionId;

use crate::ClientId;

/// Errors returned by [`Registry`](crate::Registry) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Another live client already uses this nickname (exact match).
    #[error("nickname {0:?} is already registered")]
    DuplicateNick(String),

    /// The registry already holds `max_clients` entries.
    #[error("registry is full ({0} clients)")]
    CapacityReached(usize),

    /// No client with this id is registered.
    /// Also what a second `remove` of the same id returns.
    #[error("client {0} not found")]
    NotFound(ClientId),

    /// This connection already has a registered client.
    #[error("{0} already has a registered client")]
    AlreadyRegistered(ConnectionId),

    /// No registered client is using this connection.
    #[error("no client registered on {0}")]
    ConnectionNotFound(ConnectionId),
}
