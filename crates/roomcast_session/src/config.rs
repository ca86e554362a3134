//! Configuration for session engines.

use roomcast_protocol::ConnectionId;
use roomcast_state::ReplicationSpec;
use uuid::Uuid;

/// Configuration shared by host and client engines.
///
/// Supplied once at session start; the replication spec is immutable for
/// the lifetime of the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity of the local peer (the host's own id on the host, the
    /// local user's connection id on a client).
    pub local_id: ConnectionId,
    /// Which paths of the state tree replicate over the network.
    pub replicated: ReplicationSpec,
}

impl SessionConfig {
    /// Creates a configuration with a fresh local identity.
    pub fn new(replicated: ReplicationSpec) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            replicated,
        }
    }

    /// Sets the local peer identity.
    pub fn with_local_id(mut self, local_id: ConnectionId) -> Self {
        self.local_id = local_id;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(ReplicationSpec::replicate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let id = Uuid::new_v4();
        let config = SessionConfig::new(ReplicationSpec::replicate()).with_local_id(id);

        assert_eq!(config.local_id, id);
        assert_eq!(config.replicated, ReplicationSpec::replicate());
    }

    #[test]
    fn default_ids_are_unique() {
        let a = SessionConfig::default();
        let b = SessionConfig::default();
        assert_ne!(a.local_id, b.local_id);
    }
}
