//! Transport abstraction for session traffic.

use parking_lot::Mutex;
use roomcast_protocol::ConnectionId;

/// Host-side view of the transport.
///
/// Delivery is fire-and-forget: no acknowledgements, no retries. Lost
/// messages are recovered, if at all, by the application re-syncing a
/// reconnecting peer with a fresh full snapshot.
pub trait Transport: Send + Sync {
    /// Sends bytes to every connected peer.
    fn broadcast(&self, bytes: &[u8]);

    /// Sends bytes to one peer.
    fn send_to(&self, target: ConnectionId, bytes: &[u8]);

    /// Closes one peer's connection.
    fn close(&self, target: ConnectionId);
}

/// Client-side view of the transport: the single link to the host.
pub trait HostLink: Send + Sync {
    /// Sends bytes to the host.
    fn send(&self, bytes: &[u8]);

    /// Severs the connection to the host.
    fn close(&self);
}

/// One recorded transport operation, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Bytes sent to every peer.
    Broadcast(Vec<u8>),
    /// Bytes sent to one peer.
    Unicast(ConnectionId, Vec<u8>),
    /// A peer connection closed from the host side.
    Close(ConnectionId),
}

/// A transport for testing that records all outbound operations in order.
#[derive(Debug, Default)]
pub struct MockTransport {
    events: Mutex<Vec<TransportEvent>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation so far, in issue order.
    pub fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().clone()
    }

    /// All broadcast frames so far, in send order.
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Broadcast(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// All unicast frames so far, in send order.
    pub fn unicasts(&self) -> Vec<(ConnectionId, Vec<u8>)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Unicast(target, bytes) => Some((*target, bytes.clone())),
                _ => None,
            })
            .collect()
    }

    /// Unicast frames addressed to `target`.
    pub fn sent_to(&self, target: ConnectionId) -> Vec<Vec<u8>> {
        self.unicasts()
            .into_iter()
            .filter(|(id, _)| *id == target)
            .map(|(_, bytes)| bytes)
            .collect()
    }

    /// Connections closed through this transport, in order.
    pub fn closed(&self) -> Vec<ConnectionId> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Close(target) => Some(*target),
                _ => None,
            })
            .collect()
    }

    /// Total number of frames sent by any means.
    pub fn frame_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| !matches!(event, TransportEvent::Close(_)))
            .count()
    }
}

impl Transport for MockTransport {
    fn broadcast(&self, bytes: &[u8]) {
        self.events
            .lock()
            .push(TransportEvent::Broadcast(bytes.to_vec()));
    }

    fn send_to(&self, target: ConnectionId, bytes: &[u8]) {
        self.events
            .lock()
            .push(TransportEvent::Unicast(target, bytes.to_vec()));
    }

    fn close(&self, target: ConnectionId) {
        self.events.lock().push(TransportEvent::Close(target));
    }
}

/// A host link for testing that records outbound traffic and closure.
#[derive(Debug, Default)]
pub struct MockHostLink {
    sent: Mutex<Vec<Vec<u8>>>,
    closed: Mutex<bool>,
}

impl MockHostLink {
    /// Creates a new mock link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent to the host, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Whether the link has been closed.
    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

impl HostLink for MockHostLink {
    fn send(&self, bytes: &[u8]) {
        self.sent.lock().push(bytes.to_vec());
    }

    fn close(&self) {
        *self.closed.lock() = true;
    }
}
