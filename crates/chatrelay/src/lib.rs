//! # chatrelay
//!
//! A multi-client TCP chat relay.
//!
//! Clients connect, announce themselves with a `join`, exchange `message`s,
//! and are told when peers leave. The relay keeps the authoritative set of
//! live clients, validates every inbound message, and fans each accepted
//! one out to everyone else.
//!
//! The layers, bottom up:
//!
//! - [`chatrelay_transport`]: TCP listener and connections
//! - [`chatrelay_protocol`]: wire messages and newline-framed base64 JSON
//! - [`chatrelay_registry`]: who is online and how to reach them
//! - this crate: the interpreter, the per-connection handler, the server,
//!   and a small client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatrelay::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = ChatServer::builder()
//!     .bind("127.0.0.1")
//!     .port(8005)
//!     .max_clients(5)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
pub mod interpreter;
mod server;

pub use client::{ChatClient, ClientEvent, Peer};
pub use config::ServerConfig;
pub use error::RelayError;
pub use server::{ChatServer, ChatServerBuilder, SharedRegistry};

pub use chatrelay_protocol;
pub use chatrelay_registry;
pub use chatrelay_transport;

/// The types most programs need.
pub mod prelude {
    pub use crate::interpreter::{DropReason, Outcome};
    pub use crate::{
        ChatClient, ChatServer, ChatServerBuilder, ClientEvent, RelayError, ServerConfig,
        SharedRegistry,
    };
    pub use chatrelay_protocol::{ChatMessage, MessageKind, WireMessage};
    pub use chatrelay_registry::{ClientId, ClientRecord, Registry};
}
