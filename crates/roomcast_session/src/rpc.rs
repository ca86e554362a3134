//! Realm-scoped RPC registration and dispatch support.

use crate::client::SessionClient;
use crate::error::{SessionError, SessionResult};
use crate::host::SessionHost;
use crate::store::StateStore;
use roomcast_protocol::ConnectionId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// The allowed caller→executor relationship for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realm {
    /// Any client calls; the host executes.
    Server,
    /// The host calls; one named client executes.
    Client,
    /// The host calls; every client (and the host itself) executes.
    Multicast,
}

/// A remote-callable handler.
///
/// Handlers take their dependencies explicitly: a read view of the state,
/// a mutator that routes writes through the sync engine, the per-call
/// invocation context, and the serialized argument list. Authorization is
/// the handler's own responsibility; the dispatcher supplies identity and
/// enforces nothing.
///
/// Plain functions with the matching signature implement this trait;
/// handlers that carry dependencies (a clock, an external resolver)
/// implement it on a struct holding them.
pub trait RpcHandler: Send + Sync {
    /// Executes the call.
    fn call(
        &self,
        state: &dyn StateStore,
        mutator: &Mutator<'_>,
        ctx: &InvocationContext<'_>,
        args: &[Value],
    ) -> SessionResult<()>;
}

impl<F> RpcHandler for F
where
    F: Fn(&dyn StateStore, &Mutator<'_>, &InvocationContext<'_>, &[Value]) -> SessionResult<()>
        + Send
        + Sync,
{
    fn call(
        &self,
        state: &dyn StateStore,
        mutator: &Mutator<'_>,
        ctx: &InvocationContext<'_>,
        args: &[Value],
    ) -> SessionResult<()> {
        self(state, mutator, ctx, args)
    }
}

/// A registered action, used to invoke it.
#[derive(Debug, Clone, Copy)]
pub struct Action {
    name: &'static str,
    realm: Realm,
}

impl Action {
    /// The unique action-type identifier sent on the wire.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The realm this action executes in.
    pub fn realm(&self) -> Realm {
        self.realm
    }
}

pub(crate) struct Registration {
    pub(crate) realm: Realm,
    pub(crate) handler: Box<dyn RpcHandler>,
}

/// Table of remote-callable actions.
///
/// Built once before the session starts, then moved into the engine and
/// immutable afterwards.
#[derive(Default)]
pub struct RpcRegistry {
    actions: HashMap<&'static str, Registration>,
}

impl RpcRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under a unique action name.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered; duplicate action names are
    /// a programming error caught at construction time.
    pub fn register(
        &mut self,
        realm: Realm,
        name: &'static str,
        handler: impl RpcHandler + 'static,
    ) -> Action {
        let previous = self.actions.insert(
            name,
            Registration {
                realm,
                handler: Box::new(handler),
            },
        );
        assert!(previous.is_none(), "duplicate action registration: {name}");
        Action { name, realm }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Registration> {
        self.actions.get(name)
    }
}

/// Which engine a call is executing on.
#[derive(Clone, Copy)]
pub(crate) enum Side<'a> {
    Host(&'a SessionHost),
    Client(&'a SessionClient),
}

/// Routes handler writes through the owning engine.
///
/// On the host, every mutation runs through the sync tick (diff, relay,
/// version bump). On a client, mutations apply locally only — clients
/// never originate writes to replicated state.
pub struct Mutator<'a> {
    side: Side<'a>,
}

impl<'a> Mutator<'a> {
    pub(crate) fn new(side: Side<'a>) -> Self {
        Self { side }
    }

    /// Applies a mutation to the state tree.
    pub fn apply<F: FnOnce(&mut Value)>(&self, mutation: F) {
        match self.side {
            Side::Host(host) => host.mutate(mutation),
            Side::Client(client) => client.mutate_local(mutation),
        }
    }
}

/// Per-call data handed to a handler. Constructed fresh for every
/// invocation and never retained.
pub struct InvocationContext<'a> {
    caller: Option<ConnectionId>,
    side: Side<'a>,
}

impl<'a> InvocationContext<'a> {
    pub(crate) fn new(side: Side<'a>, caller: Option<ConnectionId>) -> Self {
        Self { caller, side }
    }

    /// The connection that issued the call, when executing on the host
    /// for a remote caller. `None` for locally originated calls and for
    /// handlers executing on a client.
    pub fn caller(&self) -> Option<ConnectionId> {
        self.caller
    }

    /// Identity of the local peer.
    pub fn local_id(&self) -> ConnectionId {
        match self.side {
            Side::Host(host) => host.local_id(),
            Side::Client(client) => client.local_id(),
        }
    }

    /// Issues a further call from inside a handler.
    pub fn invoke(
        &self,
        action: &Action,
        args: Vec<Value>,
        target: Option<ConnectionId>,
    ) -> SessionResult<()> {
        match self.side {
            Side::Host(host) => host.invoke(action, args, target),
            Side::Client(client) => client.invoke(action, args),
        }
    }

    /// Closes one peer connection. Host side only.
    pub fn close_connection(&self, id: ConnectionId) -> SessionResult<()> {
        match self.side {
            Side::Host(host) => {
                host.close_connection(id);
                Ok(())
            }
            Side::Client(_) => Err(SessionError::HostOnly),
        }
    }

    /// Severs the link to the host. Client side only.
    pub fn disconnect(&self) -> SessionResult<()> {
        match self.side {
            Side::Host(_) => Err(SessionError::ClientOnly),
            Side::Client(client) => client.disconnect(),
        }
    }
}

/// Deserializes one call argument.
///
/// Missing arguments decode as `null`, so optional trailing parameters
/// come through as `Option::None` rather than an error.
pub fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> SessionResult<T> {
    let value = args.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|source| SessionError::InvalidArgument { index, source })
}
