//! # Roomcast State
//!
//! State tree model, replication filtering, and structural diffing for
//! Roomcast sessions.
//!
//! This crate provides:
//! - `ReplicationSpec` for selecting which state paths replicate
//! - `diff`/`apply` over `serde_json::Value` snapshots
//! - The ordered `Change` record vocabulary shared with the wire protocol
//!
//! This is a pure crate with no I/O operations. The state tree itself is
//! always owned by the embedding application; everything here operates on
//! borrowed snapshots.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod replication;

pub use diff::{apply, diff, strip_priors, Change, Key, Path};
pub use replication::ReplicationSpec;
