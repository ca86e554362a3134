//! # Roomcast Testkit
//!
//! Shared test utilities for the Roomcast crates.
//!
//! This crate provides proptest strategies for generating random state
//! trees and replication specs. Strategies draw field names from a small
//! shared alphabet so generated specs actually intersect generated trees.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod generators;

pub use generators::{
    object_tree_strategy, replication_spec_strategy, scalar_strategy, state_tree_strategy,
};
