//! Frame header handling for the shared transport.

use crate::messages::{ProtocolError, ProtocolResult, WireMessage};

/// Literal tag prefixed to every protocol frame, distinguishing session
/// traffic from anything else sharing the transport.
pub const FRAME_HEADER: &[u8] = b"SYNC";

/// Encodes a message into a transport frame: header followed by JSON.
pub fn frame(message: &WireMessage) -> ProtocolResult<Vec<u8>> {
    let mut bytes = FRAME_HEADER.to_vec();
    serde_json::to_writer(&mut bytes, message)?;
    Ok(bytes)
}

/// Decodes a transport frame.
///
/// Returns `None` when the header does not match — the bytes belong to
/// some other protocol and are not an error. Returns `Some(Err(..))` when
/// the header matches but the payload is malformed; callers log and drop
/// such frames without disturbing later messages.
pub fn parse(bytes: &[u8]) -> Option<ProtocolResult<WireMessage>> {
    let payload = bytes.strip_prefix(FRAME_HEADER)?;
    Some(serde_json::from_slice(payload).map_err(ProtocolError::from))
}
