//! Lobby state shape, replication spec, and roster helpers.

use roomcast_state::ReplicationSpec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Maximum accepted chat message length, in characters.
pub const CHAT_MAX_MESSAGE_LENGTH: usize = 255;

/// A role a user can hold in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// May moderate the session: kick users, toggle roles.
    Admin,
    /// May control playback without being an admin.
    Dj,
}

impl UserRole {
    /// The roster field backing this role.
    pub fn field(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Dj => "dj",
        }
    }
}

/// Why a client was disconnected from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// The host ended the session.
    HostDisconnect,
    /// The connection timed out.
    Timeout,
    /// The client presented unusable identity information.
    InvalidClientInfo,
    /// Peer protocol versions do not match.
    VersionMismatch,
    /// The session is full.
    Full,
    /// An admin kicked the user.
    Kicked,
}

/// The lobby state tree at session start.
pub fn initial_state() -> Value {
    json!({
        "users": {},
        "chat": { "messages": [] },
        "mediaPlayer": {
            "current": null,
            "queue": [],
            "playback": "idle",
            "position": 0,
        },
        "session": { "disconnectReason": null },
    })
}

/// Which lobby branches replicate.
///
/// Chat stays off the diff wire — entries are delivered by multicast so
/// each peer appends locally. The `session` branch is local-only state.
pub fn replication_spec() -> ReplicationSpec {
    ReplicationSpec::branch([
        ("users", ReplicationSpec::replicate()),
        ("mediaPlayer", ReplicationSpec::replicate()),
        ("chat", ReplicationSpec::exclude()),
        ("session", ReplicationSpec::exclude()),
    ])
}

/// Adds a user to the roster.
pub fn add_user(state: &mut Value, id: &str, name: &str, admin: bool) {
    state["users"][id] = json!({
        "name": name,
        "admin": admin,
        "dj": false,
    });
}

/// Removes a user from the roster.
pub fn remove_user(state: &mut Value, id: &str) {
    if let Some(users) = state["users"].as_object_mut() {
        users.remove(id);
    }
}

/// Display name for a user, if known.
pub fn user_name(state: &Value, id: &str) -> Option<String> {
    state["users"][id]["name"].as_str().map(str::to_string)
}

/// Whether a user holds the given role.
pub fn has_role(state: &Value, id: &str, role: UserRole) -> bool {
    state["users"][id][role.field()].as_bool().unwrap_or(false)
}

/// Whether a user may moderate the session.
pub fn is_admin(state: &Value, id: &str) -> bool {
    has_role(state, id, UserRole::Admin)
}

/// Whether a user may control playback.
pub fn has_playback_permission(state: &Value, id: &str) -> bool {
    is_admin(state, id) || has_role(state, id, UserRole::Dj)
}
