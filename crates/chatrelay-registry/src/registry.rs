//! The registry: the server's table of live clients.
//!
//! Responsible for:
//! - Assigning client ids on registration
//! - Enforcing the capacity limit and nickname uniqueness
//! - Looking clients up by connection or nickname
//! - Handing out point-in-time snapshots for broadcast fan-out
//!
//! # Concurrency note
//!
//! `Registry` is NOT thread-safe by itself. The relay keeps one instance
//! per server behind a single mutex, and every operation takes `&self` or
//! `&mut self`, so a check-then-insert like [`register`](Registry::register)
//! is atomic with respect to every other caller holding that lock.

use std::collections::{BTreeMap, HashMap};

use chatrelay_transport::ConnectionId;
use serde_json::Value;

use crate::{ClientId, ClientRecord, ConnectionHandle, RegistryConfig, RegistryError};

/// Live client table for one server instance.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ register() ──→ [entry live] ──→ remove() / remove_by_connection()
///              │                                   │
///              ├─ DuplicateNick (no change)        └─ second call → NotFound
///              └─ CapacityReached (no change)
/// ```
#[derive(Debug)]
pub struct Registry {
    /// Records keyed by id. A `BTreeMap` so iteration (and therefore
    /// snapshots) follows registration order.
    clients: BTreeMap<ClientId, ClientRecord>,

    /// Index from connection to client, kept in sync with `clients`.
    by_connection: HashMap<ConnectionId, ClientId>,

    /// Index from nickname to client, kept in sync with `clients`.
    by_nick: HashMap<String, ClientId>,

    /// The id the next registration receives.
    next_id: u64,

    config: RegistryConfig,
}

impl Registry {
    /// Creates a new, empty registry.
    ///
    /// A `max_clients` of 0 is raised to 1.
    pub fn new(mut config: RegistryConfig) -> Self {
        config.max_clients = config.max_clients.max(1);
        Self {
            clients: BTreeMap::new(),
            by_connection: HashMap::new(),
            by_nick: HashMap::new(),
            next_id: 1,
            config,
        }
    }

    /// Registers a client and returns its new id.
    ///
    /// # Errors
    /// - [`RegistryError::DuplicateNick`]: `nick` is already taken
    ///   (case-sensitive exact match)
    /// - [`RegistryError::CapacityReached`]: `max_clients` entries exist
    /// - [`RegistryError::AlreadyRegistered`]: the connection already has
    ///   an entry
    ///
    /// `ip` and `port` are stored as given and echoed back verbatim in
    /// roster messages. On error the registry is unchanged.
    pub fn register(
        &mut self,
        nick: &str,
        ip: impl Into<Value>,
        port: impl Into<Value>,
        handle: ConnectionHandle,
    ) -> Result<ClientId, RegistryError> {
        if self.by_nick.contains_key(nick) {
            return Err(RegistryError::DuplicateNick(nick.to_string()));
        }
        if self.is_full() {
            return Err(RegistryError::CapacityReached(self.config.max_clients));
        }
        let conn_id = handle.id();
        if self.by_connection.contains_key(&conn_id) {
            return Err(RegistryError::AlreadyRegistered(conn_id));
        }

        let id = ClientId(self.next_id);
        self.next_id += 1;

        let record = ClientRecord {
            id,
            nickname: nick.to_string(),
            announced_address: ip.into(),
            announced_port: port.into(),
            handle,
        };

        tracing::info!(
            client_id = %id,
            %conn_id,
            nick,
            ip = %record.announced_address,
            port = %record.announced_port,
            "client registered"
        );

        self.by_connection.insert(conn_id, id);
        self.by_nick.insert(record.nickname.clone(), id);
        self.clients.insert(id, record);
        Ok(id)
    }

    /// Finds the client registered on a connection.
    ///
    /// # Errors
    /// Returns [`RegistryError::ConnectionNotFound`] if there is none.
    pub fn lookup_by_connection(
        &self,
        conn_id: ConnectionId,
    ) -> Result<ClientId, RegistryError> {
        self.by_connection
            .get(&conn_id)
            .copied()
            .ok_or(RegistryError::ConnectionNotFound(conn_id))
    }

    /// Removes a client and returns its record.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] if the id isn't registered,
    /// including when it was already removed.
    pub fn remove(&mut self, id: ClientId) -> Result<ClientRecord, RegistryError> {
        let record = self.clients.remove(&id).ok_or(RegistryError::NotFound(id))?;
        self.by_connection.remove(&record.connection_id());
        self.by_nick.remove(&record.nickname);

        tracing::info!(client_id = %id, nick = %record.nickname, "client removed");
        Ok(record)
    }

    /// Removes whichever client is registered on `conn_id`.
    ///
    /// # Errors
    /// Returns [`RegistryError::ConnectionNotFound`] if there is none.
    pub fn remove_by_connection(
        &mut self,
        conn_id: ConnectionId,
    ) -> Result<ClientRecord, RegistryError> {
        let id = self.lookup_by_connection(conn_id)?;
        self.remove(id)
    }

    /// Copies every record, in registration order.
    ///
    /// Broadcasts iterate over a snapshot so the registry lock doesn't
    /// have to be held while messages are queued.
    pub fn snapshot(&self) -> Vec<ClientRecord> {
        self.clients.values().cloned().collect()
    }

    /// Looks up a client by nickname (exact match).
    pub fn find_by_nick(&self, nick: &str) -> Option<&ClientRecord> {
        self.by_nick.get(nick).and_then(|id| self.clients.get(id))
    }

    /// Returns `true` if a live client uses this nickname.
    pub fn contains_nick(&self, nick: &str) -> bool {
        self.by_nick.contains_key(nick)
    }

    /// Number of registered clients.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Returns `true` once `count() == max_clients`.
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.config.max_clients
    }

    /// The capacity limit.
    pub fn max_clients(&self) -> usize {
        self.config.max_clients
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
