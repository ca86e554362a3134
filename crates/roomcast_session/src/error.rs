//! Error types for the session engines.

use crate::rpc::Realm;
use roomcast_protocol::{ConnectionId, ProtocolError};
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while running a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No handler is registered under the given action name.
    #[error("unknown action {0:?}")]
    UnknownAction(String),

    /// The action's realm forbids invocation from this side.
    #[error("action {action:?} in realm {realm:?} is not callable from this side")]
    RealmViolation {
        /// Action name.
        action: String,
        /// The realm the action is registered in.
        realm: Realm,
    },

    /// A Client-realm call was issued without a destination connection.
    #[error("client-realm call requires a destination connection")]
    MissingTarget,

    /// The addressed connection is unknown, not yet authenticated, or
    /// already closed.
    #[error("connection {0} is not authenticated")]
    StaleConnection(ConnectionId),

    /// The engine is not attached to a live session.
    #[error("not attached to a session")]
    NotAttached,

    /// The operation is only meaningful on the host engine.
    #[error("operation only valid on the host")]
    HostOnly,

    /// The operation is only meaningful on a client engine.
    #[error("operation only valid on a client")]
    ClientOnly,

    /// A call argument did not deserialize to the expected type.
    #[error("invalid argument at index {index}: {source}")]
    InvalidArgument {
        /// Position in the argument list.
        index: usize,
        /// Underlying decode failure.
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SessionError::UnknownAction("kick_user".into());
        assert_eq!(err.to_string(), "unknown action \"kick_user\"");

        let err = SessionError::MissingTarget;
        assert!(err.to_string().contains("destination"));

        let err = SessionError::RealmViolation {
            action: "client_kick".into(),
            realm: Realm::Client,
        };
        assert!(err.to_string().contains("client_kick"));
    }
}
