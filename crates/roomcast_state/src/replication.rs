//! Replication filtering over the state tree.

use crate::diff::Key;
use std::collections::BTreeMap;

/// Selects which paths of the state tree are replicated to peers.
///
/// A spec is a tree isomorphic to a prefix of the state tree. Boolean
/// leaves are replicate-flags: `true` replicates the subtree, `false`
/// excludes it. Paths with no spec entry replicate by default, so only
/// explicitly excluded branches stay local.
///
/// A spec is supplied once at session start and never changes for the
/// lifetime of the session.
///
/// # Example
///
/// ```
/// use roomcast_state::ReplicationSpec;
///
/// let spec = ReplicationSpec::branch([
///     ("users", ReplicationSpec::replicate()),
///     ("chat", ReplicationSpec::replicate()),
///     ("session", ReplicationSpec::exclude()),
/// ]);
/// assert!(spec.allows(&[], &"users".into()));
/// assert!(!spec.allows(&[], &"session".into()));
/// // No entry for "playback": replicated by default.
/// assert!(spec.allows(&[], &"playback".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationSpec {
    /// Leaf flag governing an entire subtree.
    Replicate(bool),
    /// Interior node; each named field is decided individually.
    Branch(BTreeMap<String, ReplicationSpec>),
}

impl ReplicationSpec {
    /// A leaf that replicates its subtree.
    pub fn replicate() -> Self {
        ReplicationSpec::Replicate(true)
    }

    /// A leaf that excludes its subtree from replication.
    pub fn exclude() -> Self {
        ReplicationSpec::Replicate(false)
    }

    /// Builds an interior node from named children.
    pub fn branch<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = (S, ReplicationSpec)>,
        S: Into<String>,
    {
        ReplicationSpec::Branch(
            children
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        )
    }

    /// Decides whether the field `key` under `path` is replicated.
    ///
    /// Pure and deterministic: identical `(spec, path, key)` inputs always
    /// produce the same answer. The walk short-circuits at the first
    /// boolean node, which governs everything below it. Array indices have
    /// no spec entries and fall through as replicated.
    pub fn allows(&self, path: &[Key], key: &Key) -> bool {
        let mut cursor = SpecCursor::Node(self);
        for step in path {
            cursor = cursor.child(step);
            match cursor {
                SpecCursor::Open => return true,
                SpecCursor::Closed => return false,
                SpecCursor::Node(_) => {}
            }
        }
        !matches!(cursor.child(key), SpecCursor::Closed)
    }

    pub(crate) fn cursor(&self) -> SpecCursor<'_> {
        SpecCursor::Node(self)
    }
}

impl From<bool> for ReplicationSpec {
    fn from(flag: bool) -> Self {
        ReplicationSpec::Replicate(flag)
    }
}

/// Position within a spec while traversing a state tree in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecCursor<'a> {
    /// No spec entry covers this region; everything replicates.
    Open,
    /// An excluded subtree; nothing below appears in any diff.
    Closed,
    /// Still inside the spec tree.
    Node(&'a ReplicationSpec),
}

impl<'a> SpecCursor<'a> {
    /// Descends one step.
    pub(crate) fn child(self, key: &Key) -> SpecCursor<'a> {
        match self {
            SpecCursor::Open => SpecCursor::Open,
            SpecCursor::Closed => SpecCursor::Closed,
            SpecCursor::Node(ReplicationSpec::Replicate(true)) => SpecCursor::Open,
            SpecCursor::Node(ReplicationSpec::Replicate(false)) => SpecCursor::Closed,
            SpecCursor::Node(ReplicationSpec::Branch(children)) => match key {
                // Spec trees describe named fields only; array elements
                // inherit the surrounding decision.
                Key::Index(_) => SpecCursor::Open,
                Key::Field(name) => match children.get(name) {
                    None => SpecCursor::Open,
                    Some(ReplicationSpec::Replicate(true)) => SpecCursor::Open,
                    Some(ReplicationSpec::Replicate(false)) => SpecCursor::Closed,
                    Some(node @ ReplicationSpec::Branch(_)) => SpecCursor::Node(node),
                },
            },
        }
    }

    /// Whether this region is replicated at all.
    pub(crate) fn is_allowed(self) -> bool {
        !matches!(self, SpecCursor::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby_spec() -> ReplicationSpec {
        ReplicationSpec::branch([
            ("users", ReplicationSpec::replicate()),
            (
                "mediaPlayer",
                ReplicationSpec::branch([
                    ("queue", ReplicationSpec::replicate()),
                    ("pendingSeek", ReplicationSpec::exclude()),
                ]),
            ),
            ("session", ReplicationSpec::exclude()),
        ])
    }

    #[test]
    fn boolean_leaves_govern_fields() {
        let spec = lobby_spec();
        assert!(spec.allows(&[], &"users".into()));
        assert!(!spec.allows(&[], &"session".into()));
    }

    #[test]
    fn undefined_paths_replicate_by_default() {
        let spec = lobby_spec();
        // No entry for "chat" anywhere in the spec.
        assert!(spec.allows(&[], &"chat".into()));
        assert!(spec.allows(&["chat".into()], &"messages".into()));
    }

    #[test]
    fn boolean_governs_entire_subtree() {
        let spec = lobby_spec();
        assert!(!spec.allows(&["session".into()], &"disconnectReason".into()));
        assert!(spec.allows(
            &["users".into(), "u1".into()],
            &"name".into()
        ));
    }

    #[test]
    fn interior_nodes_decide_field_by_field() {
        let spec = lobby_spec();
        assert!(spec.allows(&["mediaPlayer".into()], &"queue".into()));
        assert!(!spec.allows(&["mediaPlayer".into()], &"pendingSeek".into()));
        // Sibling with no entry falls open.
        assert!(spec.allows(&["mediaPlayer".into()], &"playback".into()));
    }

    #[test]
    fn interior_node_at_terminal_is_not_excluded() {
        let spec = lobby_spec();
        // The parent itself is never diffed wholesale, but it is not an
        // excluded path either; its fields decide individually.
        assert!(spec.allows(&[], &"mediaPlayer".into()));
    }

    #[test]
    fn array_indices_fall_open() {
        let spec = lobby_spec();
        assert!(spec.allows(
            &["mediaPlayer".into(), "queue".into(), Key::Index(0)],
            &"url".into()
        ));
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let spec = lobby_spec();
        let path = [Key::from("mediaPlayer")];
        let key = Key::from("pendingSeek");
        let first = spec.allows(&path, &key);
        for _ in 0..10 {
            assert_eq!(spec.allows(&path, &key), first);
        }
    }
}
