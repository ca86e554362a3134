//! Host-side sync engine and RPC dispatcher.

use crate::config::SessionConfig;
use crate::connection::{ConnectionState, Roster};
use crate::error::{SessionError, SessionResult};
use crate::rpc::{Action, InvocationContext, Mutator, Realm, RpcRegistry, Side};
use crate::store::StateStore;
use crate::transport::Transport;
use parking_lot::RwLock;
use roomcast_protocol::{
    frame, parse, ConnectionId, FullUpdate, RpcEnvelope, Update, WireMessage,
};
use roomcast_state::{apply, diff, strip_priors};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Replication lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not attached to a session; nothing replicates.
    Idle,
    /// Attached and replicating.
    Active,
}

impl EngineState {
    /// Whether the engine is replicating.
    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Active)
    }
}

/// The authoritative peer of a session.
///
/// The host owns the replication lifecycle: it sends a complete filtered
/// snapshot to each newly authenticated connection, relays a filtered diff
/// after every local mutation, and stamps each relay with a version
/// counter owned by this instance (one per session, never process-wide).
pub struct SessionHost {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn StateStore>,
    registry: RpcRegistry,
    roster: Roster,
    state: RwLock<EngineState>,
    version: AtomicU64,
}

impl SessionHost {
    /// Creates an idle host engine.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn StateStore>,
        registry: RpcRegistry,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            registry,
            roster: Roster::new(),
            state: RwLock::new(EngineState::Idle),
            version: AtomicU64::new(0),
        }
    }

    /// Starts the session (Idle → Active).
    pub fn start(&self) {
        *self.state.write() = EngineState::Active;
        debug!(local_id = %self.config.local_id, "session host active");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Current version counter value.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Identity of the host peer.
    pub fn local_id(&self) -> ConnectionId {
        self.config.local_id
    }

    /// Number of tracked connections in any lifecycle state.
    pub fn connection_count(&self) -> usize {
        self.roster.len()
    }

    /// Whether a connection is authenticated.
    pub fn is_authenticated(&self, id: ConnectionId) -> bool {
        self.roster.is_authenticated(id)
    }

    /// Handles a transport-level connect event.
    pub fn connection_opened(&self, id: ConnectionId) {
        self.roster.insert(id);
        debug!(%id, "connection opened");
    }

    /// Marks a connection as mid-handshake.
    pub fn begin_authentication(&self, id: ConnectionId) -> bool {
        self.roster.set_state(id, ConnectionState::Authenticating)
    }

    /// Marks a connection authenticated and sends it the full baseline.
    ///
    /// The snapshot is complete, not incremental: a late joiner needs no
    /// replay of prior updates.
    pub fn connection_authenticated(&self, id: ConnectionId) -> SessionResult<()> {
        if !self.roster.set_state(id, ConnectionState::Authenticated) {
            return Err(SessionError::StaleConnection(id));
        }

        let snapshot = self.replicated_snapshot();
        let message = WireMessage::FullUpdate(FullUpdate::new(self.version(), snapshot));
        let bytes = frame(&message)?;
        debug!(%id, version = self.version(), "sending full update");
        self.transport.send_to(id, &bytes);
        Ok(())
    }

    /// Handles a transport-level disconnect event. The connection leaves
    /// the roster immediately; late frames from it are discarded.
    pub fn connection_closed(&self, id: ConnectionId) {
        self.roster.remove(id);
        debug!(%id, "connection closed");
    }

    /// Closes a connection from the host side (e.g. a kick).
    pub fn close_connection(&self, id: ConnectionId) {
        self.roster.set_state(id, ConnectionState::Closed);
        self.transport.close(id);
    }

    /// Ends the session: connections dropped, version reset, any
    /// in-flight diffs discarded.
    pub fn shutdown(&self) {
        *self.state.write() = EngineState::Idle;
        self.roster.clear();
        self.version.store(0, Ordering::SeqCst);
        debug!("session host shut down");
    }

    /// Builds the replication-filtered snapshot of the current state.
    pub fn replicated_snapshot(&self) -> Value {
        let state = self.store.snapshot();
        let empty = Value::Object(Map::new());
        let changes = diff(&empty, &state, &self.config.replicated);
        let mut baseline = Value::Object(Map::new());
        apply(&mut baseline, &changes);
        baseline
    }

    /// Runs a state-changing action through the sync tick.
    ///
    /// The mutation applies synchronously; the filtered diff between the
    /// pre- and post-action snapshots is relayed before the next action is
    /// accepted. Empty diffs produce no traffic and no version change.
    pub fn mutate<F: FnOnce(&mut Value)>(&self, action: F) {
        let before = self.store.snapshot();
        let mut after = before.clone();
        action(&mut after);
        self.store.replace(after.clone());

        if !self.state().is_active() {
            return;
        }

        let mut delta = diff(&before, &after, &self.config.replicated);
        if delta.is_empty() {
            return;
        }
        strip_priors(&mut delta);

        let v = self.version();
        let message = WireMessage::Update(Update::new(v, delta));
        match frame(&message) {
            Ok(bytes) => {
                debug!(version = v, "relaying update");
                self.transport.broadcast(&bytes);
                self.version.fetch_add(1, Ordering::SeqCst);
            }
            Err(error) => warn!(%error, "failed to encode update frame"),
        }
    }

    /// Handles bytes received from one connection.
    pub fn handle_data(&self, from: ConnectionId, bytes: &[u8]) {
        if !self.roster.is_authenticated(from) {
            debug!(%from, "discarding frame from stale connection");
            return;
        }
        let Some(result) = parse(bytes) else {
            return; // unrelated traffic on the shared transport
        };
        let message = match result {
            Ok(message) => message,
            Err(error) => {
                warn!(%from, %error, "dropping malformed frame");
                return;
            }
        };
        match message {
            WireMessage::Rpc(envelope) => self.dispatch(from, envelope),
            other => {
                debug!(%from, kind = other.kind(), "ignoring sync frame from client");
            }
        }
    }

    /// Invokes an action from host-side code.
    ///
    /// Server-realm calls execute inline — the host is the realm's valid
    /// local executor, so nothing goes over the wire. Client-realm calls
    /// require a destination and are never broadcast. Multicast calls go
    /// to every connection and also execute locally.
    pub fn invoke(
        &self,
        action: &Action,
        args: Vec<Value>,
        target: Option<ConnectionId>,
    ) -> SessionResult<()> {
        match action.realm() {
            Realm::Server => self.execute(action.name(), None, &args),
            Realm::Client => {
                let target = target.ok_or(SessionError::MissingTarget)?;
                if !self.roster.is_authenticated(target) {
                    return Err(SessionError::StaleConnection(target));
                }
                let envelope = RpcEnvelope::addressed(action.name(), args, target);
                let bytes = frame(&WireMessage::Rpc(envelope))?;
                self.transport.send_to(target, &bytes);
                Ok(())
            }
            Realm::Multicast => {
                let envelope = RpcEnvelope::new(action.name(), args.clone());
                let bytes = frame(&WireMessage::Rpc(envelope))?;
                self.transport.broadcast(&bytes);
                // The host participates in its own multicast.
                self.execute(action.name(), None, &args)
            }
        }
    }

    /// Executes an incoming call from a client connection.
    fn dispatch(&self, from: ConnectionId, envelope: RpcEnvelope) {
        let Some(registration) = self.registry.lookup(&envelope.action) else {
            warn!(action = %envelope.action, %from, "dropping call to unknown action");
            return;
        };
        if registration.realm != Realm::Server {
            warn!(
                action = %envelope.action,
                realm = ?registration.realm,
                %from,
                "dropping client call outside the server realm"
            );
            return;
        }
        if let Err(error) =
            self.run_handler(registration.handler.as_ref(), Some(from), &envelope.args)
        {
            warn!(action = %envelope.action, %from, %error, "action handler failed");
        }
    }

    /// Runs a registered handler by name with a local caller.
    fn execute(
        &self,
        name: &str,
        caller: Option<ConnectionId>,
        args: &[Value],
    ) -> SessionResult<()> {
        let registration = self
            .registry
            .lookup(name)
            .ok_or_else(|| SessionError::UnknownAction(name.to_string()))?;
        self.run_handler(registration.handler.as_ref(), caller, args)
    }

    fn run_handler(
        &self,
        handler: &dyn crate::rpc::RpcHandler,
        caller: Option<ConnectionId>,
        args: &[Value],
    ) -> SessionResult<()> {
        let mutator = Mutator::new(Side::Host(self));
        let ctx = InvocationContext::new(Side::Host(self), caller);
        handler.call(self.store.as_ref(), &mutator, &ctx, args)
    }
}
