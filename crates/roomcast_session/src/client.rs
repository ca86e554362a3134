//! Client-side sync engine: an eventually-consistent mirror of the host.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::host::EngineState;
use crate::rpc::{Action, InvocationContext, Mutator, Realm, RpcRegistry, Side};
use crate::store::{StateObserver, StateStore};
use crate::transport::HostLink;
use parking_lot::RwLock;
use roomcast_protocol::{frame, parse, ConnectionId, RpcEnvelope, WireMessage};
use roomcast_state::apply;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A client peer mirroring the host's authoritative state.
///
/// Clients never originate writes to replicated fields; they apply
/// whatever the host relays, in arrival order, and trust the version
/// stamps they receive. Any desync is resolved only by a fresh full
/// snapshot (e.g. on reconnect), never by client-side conflict detection.
pub struct SessionClient {
    config: SessionConfig,
    link: RwLock<Option<Arc<dyn HostLink>>>,
    store: Arc<dyn StateStore>,
    registry: RpcRegistry,
    observer: Arc<dyn StateObserver>,
    state: RwLock<EngineState>,
    version: AtomicU64,
}

impl SessionClient {
    /// Creates an idle client engine.
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn StateStore>,
        registry: RpcRegistry,
        observer: Arc<dyn StateObserver>,
    ) -> Self {
        Self {
            config,
            link: RwLock::new(None),
            store,
            registry,
            observer,
            state: RwLock::new(EngineState::Idle),
            version: AtomicU64::new(0),
        }
    }

    /// Attaches to a host link (Idle → Active).
    pub fn attach(&self, link: Arc<dyn HostLink>) {
        *self.link.write() = Some(link);
        *self.state.write() = EngineState::Active;
        debug!(local_id = %self.config.local_id, "session client active");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Version of the last applied snapshot or diff. Kept for telemetry;
    /// never used for conflict resolution.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Identity of the local peer.
    pub fn local_id(&self) -> ConnectionId {
        self.config.local_id
    }

    /// Handles bytes received from the host.
    pub fn handle_data(&self, bytes: &[u8]) {
        if self.link.read().is_none() {
            debug!("discarding frame received while detached");
            return;
        }
        let Some(result) = parse(bytes) else {
            return; // unrelated traffic on the shared transport
        };
        let message = match result {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, "dropping malformed frame");
                return;
            }
        };
        match message {
            WireMessage::FullUpdate(full) => {
                debug!(version = full.v, "applying full update");
                self.merge_full_update(full.state);
                self.version.store(full.v, Ordering::SeqCst);
                self.observer.remote_state_applied(full.v);
            }
            WireMessage::Update(update) => {
                debug!(version = update.v, changes = update.d.len(), "applying update");
                let mut next = self.store.snapshot();
                apply(&mut next, &update.d);
                self.store.replace(next);
                self.version.store(update.v, Ordering::SeqCst);
                self.observer.remote_state_applied(update.v);
            }
            WireMessage::Rpc(envelope) => self.dispatch(envelope),
        }
    }

    /// Invokes a Server-realm action on the host.
    ///
    /// The handler never runs locally; the call is serialized and sent to
    /// the host, which is the realm's only valid executor.
    pub fn invoke(&self, action: &Action, args: Vec<Value>) -> SessionResult<()> {
        if action.realm() != Realm::Server {
            return Err(SessionError::RealmViolation {
                action: action.name().to_string(),
                realm: action.realm(),
            });
        }
        let link = self.link.read().clone().ok_or(SessionError::NotAttached)?;
        let envelope = RpcEnvelope::new(action.name(), args);
        let bytes = frame(&WireMessage::Rpc(envelope))?;
        link.send(&bytes);
        Ok(())
    }

    /// Severs the link to the host and resets session state.
    pub fn disconnect(&self) -> SessionResult<()> {
        let link = self.link.read().clone().ok_or(SessionError::NotAttached)?;
        link.close();
        self.reset();
        Ok(())
    }

    /// Handles loss of the underlying transport. The engine resets its
    /// session-scoped state but does not attempt reconnection.
    pub fn connection_lost(&self) {
        debug!("host connection lost");
        self.reset();
    }

    /// Applies a local-only mutation, without relaying anything.
    pub(crate) fn mutate_local<F: FnOnce(&mut Value)>(&self, mutation: F) {
        let mut next = self.store.snapshot();
        mutation(&mut next);
        self.store.replace(next);
    }

    fn reset(&self) {
        *self.link.write() = None;
        *self.state.write() = EngineState::Idle;
        self.version.store(0, Ordering::SeqCst);
    }

    /// Merges a full snapshot: each replicated top-level branch is
    /// shallow-merged key by key, so branches and fields that never
    /// replicate survive. Second-level keys present in the snapshot
    /// replace the local value wholesale.
    fn merge_full_update(&self, incoming: Value) {
        let mut next = self.store.snapshot();
        if !next.is_object() {
            next = Value::Object(Map::new());
        }
        if let (Value::Object(local), Value::Object(branches)) = (&mut next, incoming) {
            for (name, branch) in branches {
                let replacement = match (local.get_mut(&name), branch) {
                    (Some(Value::Object(local_branch)), Value::Object(incoming_branch)) => {
                        for (key, value) in incoming_branch {
                            local_branch.insert(key, value);
                        }
                        continue;
                    }
                    (_, incoming_branch) => incoming_branch,
                };
                local.insert(name, replacement);
            }
        }
        self.store.replace(next);
    }

    /// Executes an incoming call from the host.
    fn dispatch(&self, envelope: RpcEnvelope) {
        let Some(registration) = self.registry.lookup(&envelope.action) else {
            warn!(action = %envelope.action, "dropping call to unknown action");
            return;
        };
        match registration.realm {
            Realm::Client | Realm::Multicast => {
                let mutator = Mutator::new(Side::Client(self));
                let ctx = InvocationContext::new(Side::Client(self), None);
                if let Err(error) =
                    registration
                        .handler
                        .call(self.store.as_ref(), &mutator, &ctx, &envelope.args)
                {
                    warn!(action = %envelope.action, %error, "action handler failed");
                }
            }
            Realm::Server => {
                warn!(
                    action = %envelope.action,
                    "dropping server-realm call received on a client"
                );
            }
        }
    }
}
