//! # Roomcast Protocol
//!
//! Wire framing and message shapes for Roomcast sessions.
//!
//! This crate provides:
//! - The `SYNC` frame header shared by every protocol message
//! - `WireMessage` payloads (full snapshots, incremental diffs, RPC calls)
//! - `frame`/`parse` for moving between messages and transport bytes
//!
//! This is a pure protocol crate with no I/O operations. Frames share the
//! transport with unrelated traffic; [`parse`] distinguishes "not ours"
//! (ignored) from "ours but malformed" (an error for the caller to log and
//! drop).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod messages;

pub use envelope::{frame, parse, FRAME_HEADER};
pub use messages::{
    ConnectionId, FullUpdate, ProtocolError, ProtocolResult, RpcEnvelope, Update, WireMessage,
};
