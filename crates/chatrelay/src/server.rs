//! `ChatServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties together the
//! layers: transport → protocol → registry → interpreter.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatrelay_protocol::{Base64JsonCodec, Codec, FrameCodec};
use chatrelay_registry::Registry;
use chatrelay_transport::{TcpTransport, Transport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{RelayError, ServerConfig};

/// How long to pause after a failed accept before trying again, so a
/// persistent error (e.g. out of file descriptors) doesn't spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The registry shared by every connection task.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: SharedRegistry,
    pub(crate) codec: C,
    pub(crate) max_frame_len: usize,
    pub(crate) outbound_capacity: usize,
}

impl<C: Codec + Clone> ServerState<C> {
    /// A fresh frame codec for one direction of one connection.
    pub(crate) fn frame_codec(&self) -> FrameCodec<C> {
        FrameCodec::with_codec(self.codec.clone(), self.max_frame_len)
    }
}

/// Builder for configuring and starting a chat relay.
///
/// # Example
///
/// ```rust,no_run
/// use chatrelay::ChatServer;
///
/// # async fn start() -> Result<(), chatrelay::RelayError> {
/// let server = ChatServer::builder()
///     .bind("0.0.0.0")
///     .port(8005)
///     .max_clients(10)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatServerBuilder {
    config: ServerConfig,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the interface to bind to.
    pub fn bind(mut self, host: &str) -> Self {
        self.config.bind_host = host.to_string();
        self
    }

    /// Sets the port to listen on. `0` picks a free one.
    pub fn port(mut self, port: u16) -> Self {
        self.config.bind_port = port;
        self
    }

    /// Sets the maximum number of registered clients.
    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.config.max_clients = max_clients;
        self
    }

    /// Sets the largest accepted frame payload, in bytes.
    pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.config.max_frame_len = max_frame_len;
        self
    }

    /// Sets how many messages may queue for one client before the relay
    /// drops it as too slow.
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Validates the configuration and binds the listener.
    ///
    /// # Errors
    /// [`RelayError::Config`] for an unusable configuration, or
    /// [`RelayError::Transport`] if the address can't be bound.
    pub async fn build(self) -> Result<ChatServer, RelayError> {
        self.config.validate()?;
        let transport = TcpTransport::bind(&self.config.bind_addr()).await?;

        let state = Arc::new(ServerState {
            registry: Arc::new(Mutex::new(Registry::new(self.config.registry_config()))),
            codec: Base64JsonCodec,
            max_frame_len: self.config.max_frame_len,
            outbound_capacity: self.config.outbound_capacity,
        });

        Ok(ChatServer {
            transport,
            state,
            config: self.config,
        })
    }
}

/// A bound chat relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ChatServer<C: Codec = Base64JsonCodec> {
    transport: TcpTransport,
    state: Arc<ServerState<C>>,
    config: ServerConfig,
}

impl ChatServer<Base64JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }
}

impl<C: Codec + Clone> ChatServer<C> {
    /// Returns the local address the server is bound to.
    ///
    /// # Errors
    /// Returns [`RelayError::Transport`] if the OS can't report it.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.transport.local_addr()?)
    }

    /// A handle to the live registry, for inspection.
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.state.registry)
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Stopping only closes the listener. Connections already accepted
    /// keep running until their peers go away.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            addr = %self.local_addr()?,
            max_clients = self.config.max_clients,
            "chat relay running"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        tracing::info!("chat relay stopped accepting connections");
        Ok(())
    }
}
