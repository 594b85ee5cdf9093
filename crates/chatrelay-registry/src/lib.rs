//! Client registry for chatrelay.
//!
//! The registry is the server's authoritative table of live, joined
//! clients. It enforces the two invariants the relay depends on:
//!
//! 1. **Capacity**: never more than `max_clients` entries.
//! 2. **Unique nicknames**: no two entries share a nickname.
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay (above)  ← interpreter + connection handlers mutate the registry
//!     ↕
//! Registry (this crate)  ← who is connected, and how to reach them
//!     ↕
//! Protocol / Transport (below)  ← WireMessage, ConnectionId
//! ```

mod error;
mod record;
mod registry;

pub use error::RegistryError;
pub use record::{
    ClientId, ClientRecord, ConnectionHandle, DEFAULT_OUTBOUND_CAPACITY, PeerReceiver, PeerSender,
    RegistryConfig,
};
pub use registry::Registry;
