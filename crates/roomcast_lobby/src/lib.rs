//! # Roomcast Lobby
//!
//! The co-viewing application layer built on the Roomcast session core:
//! a user roster with roles, chat with join/leave announcements, a media
//! queue with request/resolve flow, and moderation actions (kick, role
//! toggle).
//!
//! This crate provides:
//! - The lobby state shape and its replication spec (chat and the
//!   local-only `session` branch stay off the wire)
//! - Registered actions for every realm (`register_lobby`)
//! - Seams for the ambient world: a [`Clock`] and a [`MediaResolver`]
//!
//! Policy lives in the handlers: admin checks gate moderation, playback
//! permissions gate transport control, and denials are silent no-ops.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod actions;
mod clock;
mod media;
mod state;

pub use actions::{register_lobby, LobbyActions, LobbyDeps};
pub use clock::{Clock, FixedClock, SystemClock};
pub use media::{MediaError, MediaResolver, ResolvedMedia, StaticResolver};
pub use state::{
    add_user, has_playback_permission, has_role, initial_state, is_admin, remove_user,
    replication_spec, user_name, DisconnectReason, UserRole, CHAT_MAX_MESSAGE_LENGTH,
};
