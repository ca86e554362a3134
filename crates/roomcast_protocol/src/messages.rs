//! Protocol messages for session sync and RPC.

use roomcast_state::Change;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Identity of one peer connection. Stable for the connection's lifetime
/// and the addressing unit for unicast delivery.
pub type ConnectionId = Uuid;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while encoding or decoding protocol frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A recognized frame carried a payload that is not valid JSON for
    /// any known message shape.
    #[error("malformed frame payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// A protocol message, tagged on the wire by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// Complete filtered snapshot sent to a newly authenticated peer.
    #[serde(rename = "FULL_UPDATE")]
    FullUpdate(FullUpdate),
    /// Incremental diff relayed after a host-side mutation.
    #[serde(rename = "UPDATE")]
    Update(Update),
    /// Remote invocation envelope.
    #[serde(rename = "RPC")]
    Rpc(RpcEnvelope),
}

impl WireMessage {
    /// Short name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::FullUpdate(_) => "FULL_UPDATE",
            WireMessage::Update(_) => "UPDATE",
            WireMessage::Rpc(_) => "RPC",
        }
    }
}

/// Complete baseline state for a late joiner. Not incremental: the
/// receiver needs no prior update history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullUpdate {
    /// Version of the snapshot.
    pub v: u64,
    /// Replication-filtered state tree.
    pub state: Value,
}

impl FullUpdate {
    /// Creates a full update message.
    pub fn new(v: u64, state: Value) -> Self {
        Self { v, state }
    }
}

/// An ordered diff between two consecutive host states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Version this diff was relayed at.
    pub v: u64,
    /// Change records, to be applied in order.
    pub d: Vec<Change>,
}

impl Update {
    /// Creates an update message.
    pub fn new(v: u64, d: Vec<Change>) -> Self {
        Self { v, d }
    }
}

/// A remote invocation: which action, with which arguments, and (for
/// host-to-one-client calls only) which connection it is addressed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// Registered action name.
    pub action: String,
    /// Serialized argument list.
    pub args: Vec<Value>,
    /// Destination connection, present only for Client-realm calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ConnectionId>,
}

impl RpcEnvelope {
    /// Creates an envelope with no destination (Server/Multicast realms).
    pub fn new(action: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            action: action.into(),
            args,
            target: None,
        }
    }

    /// Creates an envelope addressed to one connection (Client realm).
    pub fn addressed(action: impl Into<String>, args: Vec<Value>, target: ConnectionId) -> Self {
        Self {
            action: action.into(),
            args,
            target: Some(target),
        }
    }
}
