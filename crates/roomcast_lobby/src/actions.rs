//! Remote-callable lobby actions.

use crate::clock::Clock;
use crate::media::MediaResolver;
use crate::state::{
    has_playback_permission, has_role, is_admin, user_name, DisconnectReason, UserRole,
    CHAT_MAX_MESSAGE_LENGTH,
};
use roomcast_session::{
    arg, Action, InvocationContext, Mutator, Realm, RpcHandler, RpcRegistry, SessionResult,
    StateStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// External collaborators the lobby actions depend on.
pub struct LobbyDeps {
    /// Time source for chat timestamps.
    pub clock: Arc<dyn Clock>,
    /// Media metadata resolution.
    pub resolver: Arc<dyn MediaResolver>,
}

impl LobbyDeps {
    /// Bundles the lobby's external dependencies.
    pub fn new(clock: Arc<dyn Clock>, resolver: Arc<dyn MediaResolver>) -> Self {
        Self { clock, resolver }
    }
}

/// Handles to every registered lobby action.
pub struct LobbyActions {
    /// Client → host: post a chat message.
    pub add_chat: Action,
    /// Host → everyone: deliver a chat entry.
    pub chat_message: Action,
    /// Host → everyone: announce a join.
    pub user_joined: Action,
    /// Host → everyone: announce a departure.
    pub user_left: Action,
    /// Client → host: moderate a user off the session.
    pub kick_user: Action,
    /// Host → one client: you were kicked.
    pub client_kick: Action,
    /// Client → host: toggle a role bit on a user.
    pub toggle_user_role: Action,
    /// Client → host: queue a media URL.
    pub request_media: Action,
    /// Client → host: toggle play/pause.
    pub request_play_pause: Action,
    /// Client → host: advance the queue.
    pub request_next: Action,
    /// Client → host: seek within the current item.
    pub request_seek: Action,
}

/// Registers every lobby action. Call once per engine, before the
/// registry is moved into it; both host and clients register the same
/// table so action names line up on the wire.
pub fn register_lobby(registry: &mut RpcRegistry, deps: &LobbyDeps) -> LobbyActions {
    let chat_message = registry.register(Realm::Multicast, "chat_message", chat_message);
    let client_kick = registry.register(Realm::Client, "client_kick", client_kick);
    let add_chat = registry.register(
        Realm::Server,
        "add_chat",
        AddChat {
            clock: Arc::clone(&deps.clock),
            chat_message,
        },
    );
    let user_joined = registry.register(
        Realm::Multicast,
        "user_joined",
        Announce {
            clock: Arc::clone(&deps.clock),
            verb: "joined",
        },
    );
    let user_left = registry.register(
        Realm::Multicast,
        "user_left",
        Announce {
            clock: Arc::clone(&deps.clock),
            verb: "left",
        },
    );
    let kick_user = registry.register(Realm::Server, "kick_user", KickUser { client_kick });
    let toggle_user_role = registry.register(Realm::Server, "toggle_user_role", toggle_user_role);
    let request_media = registry.register(
        Realm::Server,
        "request_media",
        RequestMedia {
            resolver: Arc::clone(&deps.resolver),
        },
    );
    let request_play_pause =
        registry.register(Realm::Server, "request_play_pause", request_play_pause);
    let request_next = registry.register(Realm::Server, "request_next", request_next);
    let request_seek = registry.register(Realm::Server, "request_seek", request_seek);

    LobbyActions {
        add_chat,
        chat_message,
        user_joined,
        user_left,
        kick_user,
        client_kick,
        toggle_user_role,
        request_media,
        request_play_pause,
        request_next,
        request_seek,
    }
}

/// Whoever issued the call, falling back to the local peer for calls
/// originated on this side.
fn requester(ctx: &InvocationContext<'_>) -> String {
    ctx.caller().unwrap_or_else(|| ctx.local_id()).to_string()
}

fn push_chat(mutator: &Mutator<'_>, entry: Value) {
    mutator.apply(move |state| {
        if !state["chat"]["messages"].is_array() {
            state["chat"]["messages"] = json!([]);
        }
        if let Some(messages) = state["chat"]["messages"].as_array_mut() {
            messages.push(entry);
        }
    });
}

/// Server realm: validate a chat message and multicast it to everyone.
struct AddChat {
    clock: Arc<dyn Clock>,
    chat_message: Action,
}

impl RpcHandler for AddChat {
    fn call(
        &self,
        state: &dyn StateStore,
        _mutator: &Mutator<'_>,
        ctx: &InvocationContext<'_>,
        args: &[Value],
    ) -> SessionResult<()> {
        let text: String = arg(args, 0)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        let content: String = trimmed.chars().take(CHAT_MAX_MESSAGE_LENGTH).collect();

        let author_id = requester(ctx);
        let author = user_name(&state.snapshot(), &author_id).unwrap_or(author_id);
        let entry = json!({
            "author": author,
            "content": content,
            "timestamp": self.clock.now_millis(),
        });
        ctx.invoke(&self.chat_message, vec![entry], None)
    }
}

/// Multicast realm: append a delivered chat entry to the local log.
fn chat_message(
    _state: &dyn StateStore,
    mutator: &Mutator<'_>,
    _ctx: &InvocationContext<'_>,
    args: &[Value],
) -> SessionResult<()> {
    let Some(entry) = args.first().filter(|entry| entry.is_object()).cloned() else {
        return Ok(());
    };
    push_chat(mutator, entry);
    Ok(())
}

/// Multicast realm: "<name> has joined/left". The named peer skips its
/// own announcement.
struct Announce {
    clock: Arc<dyn Clock>,
    verb: &'static str,
}

impl RpcHandler for Announce {
    fn call(
        &self,
        state: &dyn StateStore,
        mutator: &Mutator<'_>,
        ctx: &InvocationContext<'_>,
        args: &[Value],
    ) -> SessionResult<()> {
        let user_id: String = arg(args, 0)?;
        if ctx.local_id().to_string() == user_id {
            return Ok(());
        }
        let name =
            user_name(&state.snapshot(), &user_id).unwrap_or_else(|| "someone".to_string());
        push_chat(
            mutator,
            json!({
                "content": format!("{name} has {}", self.verb),
                "timestamp": self.clock.now_millis(),
            }),
        );
        Ok(())
    }
}

/// Client realm: record why we were kicked and drop the connection.
fn client_kick(
    _state: &dyn StateStore,
    mutator: &Mutator<'_>,
    ctx: &InvocationContext<'_>,
    args: &[Value],
) -> SessionResult<()> {
    let reason: DisconnectReason = arg(args, 0)?;
    debug!(?reason, "received kick");
    mutator.apply(move |state| {
        state["session"]["disconnectReason"] = json!(reason);
    });
    ctx.disconnect()
}

/// Server realm: kick a user. Admin-only; denials are silent no-ops.
/// The kick message reaches the target before its connection closes.
struct KickUser {
    client_kick: Action,
}

impl RpcHandler for KickUser {
    fn call(
        &self,
        state: &dyn StateStore,
        _mutator: &Mutator<'_>,
        ctx: &InvocationContext<'_>,
        args: &[Value],
    ) -> SessionResult<()> {
        let target: String = arg(args, 0)?;
        let requester = requester(ctx);
        if requester == target {
            return Ok(());
        }
        let snapshot = state.snapshot();
        if !is_admin(&snapshot, &requester) {
            debug!(%requester, %target, "ignoring kick from non-admin");
            return Ok(());
        }
        if snapshot["users"][&target].is_null() {
            return Ok(());
        }
        let Ok(connection) = Uuid::parse_str(&target) else {
            return Ok(());
        };
        ctx.invoke(
            &self.client_kick,
            vec![json!(DisconnectReason::Kicked)],
            Some(connection),
        )?;
        ctx.close_connection(connection)
    }
}

/// Server realm: toggle a role bit on a user. Admin-only.
fn toggle_user_role(
    state: &dyn StateStore,
    mutator: &Mutator<'_>,
    ctx: &InvocationContext<'_>,
    args: &[Value],
) -> SessionResult<()> {
    let target: String = arg(args, 0)?;
    let role: UserRole = arg(args, 1)?;
    let requester = requester(ctx);
    if requester == target {
        return Ok(());
    }
    let snapshot = state.snapshot();
    if !is_admin(&snapshot, &requester) {
        return Ok(());
    }
    if snapshot["users"][&target].is_null() {
        return Ok(());
    }
    let enabled = !has_role(&snapshot, &target, role);
    mutator.apply(move |state| {
        state["users"][&target][role.field()] = json!(enabled);
    });
    Ok(())
}

/// Server realm: resolve a URL and play or queue it. Resolution failures
/// are contained here; the requester is not notified.
struct RequestMedia {
    resolver: Arc<dyn MediaResolver>,
}

impl RpcHandler for RequestMedia {
    fn call(
        &self,
        state: &dyn StateStore,
        mutator: &Mutator<'_>,
        ctx: &InvocationContext<'_>,
        args: &[Value],
    ) -> SessionResult<()> {
        let url: String = arg(args, 0)?;
        let media = match self.resolver.resolve(&url) {
            Ok(media) => media,
            Err(error) => {
                warn!(%url, %error, "could not resolve requested media");
                return Ok(());
            }
        };

        let owner_id = requester(ctx);
        let owner_name = user_name(&state.snapshot(), &owner_id);
        let item = json!({
            "url": media.url,
            "title": media.title,
            "duration": media.duration_ms,
            "thumbnail": media.thumbnail_url,
            "ownerId": owner_id,
            "ownerName": owner_name,
        });

        mutator.apply(move |state| {
            if state["mediaPlayer"]["current"].is_null() {
                state["mediaPlayer"]["current"] = item;
                state["mediaPlayer"]["playback"] = json!("playing");
                state["mediaPlayer"]["position"] = json!(0);
            } else if let Some(queue) = state["mediaPlayer"]["queue"].as_array_mut() {
                queue.push(item);
            } else {
                state["mediaPlayer"]["queue"] = json!([item]);
            }
        });
        Ok(())
    }
}

/// Server realm: toggle play/pause. Requires playback permission.
fn request_play_pause(
    state: &dyn StateStore,
    mutator: &Mutator<'_>,
    ctx: &InvocationContext<'_>,
    _args: &[Value],
) -> SessionResult<()> {
    let snapshot = state.snapshot();
    if !has_playback_permission(&snapshot, &requester(ctx)) {
        return Ok(());
    }
    if snapshot["mediaPlayer"]["current"].is_null() {
        return Ok(());
    }
    let next = match snapshot["mediaPlayer"]["playback"].as_str() {
        Some("playing") => "paused",
        _ => "playing",
    };
    mutator.apply(move |state| {
        state["mediaPlayer"]["playback"] = json!(next);
    });
    Ok(())
}

/// Server realm: advance to the next queued item.
fn request_next(
    state: &dyn StateStore,
    mutator: &Mutator<'_>,
    ctx: &InvocationContext<'_>,
    _args: &[Value],
) -> SessionResult<()> {
    let snapshot = state.snapshot();
    if !has_playback_permission(&snapshot, &requester(ctx)) {
        return Ok(());
    }
    mutator.apply(|state| {
        let head = state["mediaPlayer"]["queue"]
            .as_array_mut()
            .and_then(|queue| {
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            });
        match head {
            Some(item) => {
                state["mediaPlayer"]["current"] = item;
                state["mediaPlayer"]["playback"] = json!("playing");
            }
            None => {
                state["mediaPlayer"]["current"] = Value::Null;
                state["mediaPlayer"]["playback"] = json!("idle");
            }
        }
        state["mediaPlayer"]["position"] = json!(0);
    });
    Ok(())
}

/// Server realm: seek within the current item.
fn request_seek(
    state: &dyn StateStore,
    mutator: &Mutator<'_>,
    ctx: &InvocationContext<'_>,
    args: &[Value],
) -> SessionResult<()> {
    let position: u64 = arg(args, 0)?;
    let snapshot = state.snapshot();
    if !has_playback_permission(&snapshot, &requester(ctx)) {
        return Ok(());
    }
    if snapshot["mediaPlayer"]["current"].is_null() {
        return Ok(());
    }
    mutator.apply(move |state| {
        state["mediaPlayer"]["position"] = json!(position);
    });
    Ok(())
}
