//! State ownership seams between the engines and the application.

use parking_lot::RwLock;
use serde_json::Value;

/// Access to the application-owned state tree.
///
/// The engines never own the state; they read snapshots and write whole
/// trees back through this contract. The application remains free to keep
/// its state wherever it likes (a UI store, a database row, a test
/// fixture).
pub trait StateStore: Send + Sync {
    /// Returns a snapshot of the current state tree.
    fn snapshot(&self) -> Value;

    /// Replaces the state tree with `next`.
    fn replace(&self, next: Value);
}

/// Notification that network-applied state changed.
///
/// Emitted after a snapshot or diff from the host has been written back,
/// so presentation layers can re-render without treating the write as a
/// new user action. Deliberately carries no payload beyond the version.
pub trait StateObserver: Send + Sync {
    /// Called once per applied snapshot or diff.
    fn remote_state_applied(&self, version: u64);
}

/// Observer that ignores every notification.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl StateObserver for NoopObserver {
    fn remote_state_applied(&self, _version: u64) {}
}

/// A simple in-memory state store.
#[derive(Debug)]
pub struct SharedStore {
    state: RwLock<Value>,
}

impl SharedStore {
    /// Creates a store holding `initial`.
    pub fn new(initial: Value) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }
}

impl StateStore for SharedStore {
    fn snapshot(&self) -> Value {
        self.state.read().clone()
    }

    fn replace(&self, next: Value) {
        *self.state.write() = next;
    }
}
