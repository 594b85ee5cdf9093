//! Unified error type for chatrelay.

use chatrelay_protocol::ProtocolError;
use chatrelay_registry::RegistryError;
use chatrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, connect).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing, encoding, stream I/O).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry-level error (duplicate nick, capacity, not found).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The server configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
