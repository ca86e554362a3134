//! # Roomcast Session
//!
//! Sync engine and RPC dispatch for Roomcast sessions.
//!
//! This crate provides:
//! - `SessionHost`: the authoritative peer — full snapshots for joiners,
//!   filtered diff relay on every mutation, a per-session version counter
//! - `SessionClient`: an eventually-consistent mirror applying snapshots
//!   and diffs in arrival order
//! - Realm-scoped RPC (`Server`, `Client`, `Multicast`) over the same
//!   transport, with plain-function handlers and explicit invocation
//!   contexts
//! - Transport and state-store seams so the embedding application keeps
//!   ownership of sockets and state
//!
//! ## Architecture
//!
//! The host is the sole writer of authoritative state. Clients never
//! originate competing writes to replicated fields; they mirror whatever
//! the host relays and resync via a fresh full snapshot on reconnect.
//! Mutation and diff relay happen synchronously within one logical tick,
//! so the differencer never observes a partially applied action. Sends
//! are fire-and-forget: no delivery acks, no retries at this layer.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod connection;
mod error;
mod host;
mod rpc;
mod store;
mod transport;

pub use client::SessionClient;
pub use config::SessionConfig;
pub use connection::{Connection, ConnectionState};
pub use error::{SessionError, SessionResult};
pub use host::{EngineState, SessionHost};
pub use rpc::{arg, Action, InvocationContext, Mutator, Realm, RpcHandler, RpcRegistry};
pub use store::{NoopObserver, SharedStore, StateObserver, StateStore};
pub use transport::{HostLink, MockHostLink, MockTransport, Transport, TransportEvent};

pub use roomcast_protocol::ConnectionId;
