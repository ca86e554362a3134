//! Connection lifecycle tracking on the host.

use parking_lot::RwLock;
use roomcast_protocol::ConnectionId;
use std::collections::HashMap;

/// Lifecycle state of one peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport-level connection established.
    Connecting,
    /// Identity exchange in progress.
    Authenticating,
    /// Fully joined; eligible for sync and RPC traffic.
    Authenticated,
    /// Closed; any late-arriving messages are discarded.
    Closed,
}

/// One peer link as the host sees it.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Stable identity for the connection's lifetime.
    pub id: ConnectionId,
    /// Current lifecycle state.
    pub state: ConnectionState,
}

impl Connection {
    /// Whether this connection may send and receive session traffic.
    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }
}

/// The host's table of live connections.
///
/// Teardown removes entries immediately so late-arriving messages from a
/// closed connection can never reach state.
#[derive(Debug, Default)]
pub(crate) struct Roster {
    entries: RwLock<HashMap<ConnectionId, Connection>>,
}

impl Roster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection in the `Connecting` state.
    pub(crate) fn insert(&self, id: ConnectionId) {
        self.entries.write().insert(
            id,
            Connection {
                id,
                state: ConnectionState::Connecting,
            },
        );
    }

    /// Moves a known connection to a new lifecycle state. Returns false
    /// for unknown connections.
    pub(crate) fn set_state(&self, id: ConnectionId, state: ConnectionState) -> bool {
        match self.entries.write().get_mut(&id) {
            Some(connection) => {
                connection.state = state;
                true
            }
            None => false,
        }
    }

    /// Whether the connection is known and authenticated.
    pub(crate) fn is_authenticated(&self, id: ConnectionId) -> bool {
        self.entries
            .read()
            .get(&id)
            .is_some_and(Connection::is_authenticated)
    }

    /// Removes a connection entirely.
    pub(crate) fn remove(&self, id: ConnectionId) {
        self.entries.write().remove(&id);
    }

    /// Number of tracked connections in any state.
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Drops every connection.
    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}
