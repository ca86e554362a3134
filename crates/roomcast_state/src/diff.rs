//! Structural diffing between state tree snapshots.

use crate::replication::{ReplicationSpec, SpecCursor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One step into the state tree: a named field or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Array element position.
    Index(usize),
    /// Object field name.
    Field(String),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// A path from the state tree root to one node.
pub type Path = Vec<Key>;

/// A single ordered change record.
///
/// Diffs are not commutative across reordering; consumers MUST apply the
/// records in the order given. Array shrinkage is emitted at descending
/// indices so that in-order application is correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// A field or element that did not exist before.
    New {
        /// Where the value appears.
        path: Path,
        /// The inserted value, already replication-filtered.
        value: Value,
    },
    /// A field or element that was removed.
    Delete {
        /// Where the value used to be.
        path: Path,
    },
    /// A value that changed in place (scalar edit or type change).
    Edit {
        /// Where the value lives.
        path: Path,
        /// The new value.
        value: Value,
        /// The previous value. Carried for local consumers only and
        /// stripped before transmission; see [`strip_priors`].
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prior: Option<Value>,
    },
}

impl Change {
    /// The path this record touches.
    pub fn path(&self) -> &[Key] {
        match self {
            Change::New { path, .. } | Change::Delete { path } | Change::Edit { path, .. } => path,
        }
    }
}

/// Computes the ordered, filtered diff between two snapshots.
///
/// Subtrees the spec excludes never appear in the output, even when they
/// changed, and values carried by `New`/`Edit` records are pruned of
/// excluded fields.
pub fn diff(before: &Value, after: &Value, spec: &ReplicationSpec) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_node(before, after, spec.cursor(), &mut Vec::new(), &mut changes);
    changes
}

fn diff_node(
    before: &Value,
    after: &Value,
    cursor: SpecCursor<'_>,
    path: &mut Path,
    out: &mut Vec<Change>,
) {
    match (before, after) {
        (Value::Object(prev), Value::Object(next)) => {
            for (name, next_value) in next {
                let key = Key::Field(name.clone());
                let child = cursor.child(&key);
                if !child.is_allowed() {
                    continue;
                }
                match prev.get(name) {
                    Some(prev_value) => {
                        path.push(key);
                        diff_node(prev_value, next_value, child, path, out);
                        path.pop();
                    }
                    None => {
                        let mut record_path = path.clone();
                        record_path.push(key);
                        out.push(Change::New {
                            path: record_path,
                            value: prune(next_value, child),
                        });
                    }
                }
            }
            for name in prev.keys() {
                if next.contains_key(name) {
                    continue;
                }
                let key = Key::Field(name.clone());
                if !cursor.child(&key).is_allowed() {
                    continue;
                }
                let mut record_path = path.clone();
                record_path.push(key);
                out.push(Change::Delete { path: record_path });
            }
        }
        (Value::Array(prev), Value::Array(next)) => {
            let common = prev.len().min(next.len());
            for index in 0..common {
                let key = Key::Index(index);
                let child = cursor.child(&key);
                path.push(key);
                diff_node(&prev[index], &next[index], child, path, out);
                path.pop();
            }
            for (index, value) in next.iter().enumerate().skip(common) {
                let key = Key::Index(index);
                let child = cursor.child(&key);
                let mut record_path = path.clone();
                record_path.push(key);
                out.push(Change::New {
                    path: record_path,
                    value: prune(value, child),
                });
            }
            // Highest index first so in-order application removes the
            // right elements.
            for index in (common..prev.len()).rev() {
                let mut record_path = path.clone();
                record_path.push(Key::Index(index));
                out.push(Change::Delete { path: record_path });
            }
        }
        _ => {
            if before != after {
                out.push(Change::Edit {
                    path: path.clone(),
                    value: prune(after, cursor),
                    prior: Some(before.clone()),
                });
            }
        }
    }
}

/// Copies a value, dropping fields the spec excludes.
fn prune(value: &Value, cursor: SpecCursor<'_>) -> Value {
    match (value, cursor) {
        (Value::Object(fields), SpecCursor::Node(_)) => {
            let mut pruned = Map::new();
            for (name, field_value) in fields {
                let child = cursor.child(&Key::Field(name.clone()));
                if child.is_allowed() {
                    pruned.insert(name.clone(), prune(field_value, child));
                }
            }
            Value::Object(pruned)
        }
        _ => value.clone(),
    }
}

/// Removes the `prior` value from edit records before transmission.
pub fn strip_priors(changes: &mut [Change]) {
    for change in changes {
        if let Change::Edit { prior, .. } = change {
            *prior = None;
        }
    }
}

/// Applies a diff to a snapshot, mutating it in place.
///
/// Never fails: paths not currently present are created (intermediate
/// containers included), type mismatches are overwritten, and deletions of
/// absent targets are no-ops. Records are applied strictly in the order
/// given.
pub fn apply(target: &mut Value, changes: &[Change]) {
    for change in changes {
        match change {
            Change::New { path, value } | Change::Edit { path, value, .. } => {
                *slot(target, path) = value.clone();
            }
            Change::Delete { path } => {
                let Some((last, parent_path)) = path.split_last() else {
                    *target = Value::Null;
                    continue;
                };
                match (existing_slot(target, parent_path), last) {
                    (Some(Value::Object(fields)), Key::Field(name)) => {
                        fields.remove(name);
                    }
                    (Some(Value::Array(items)), Key::Index(index)) if *index < items.len() => {
                        items.remove(*index);
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Navigates to the node at `path` without creating anything.
fn existing_slot<'a>(root: &'a mut Value, path: &[Key]) -> Option<&'a mut Value> {
    let mut node = root;
    for key in path {
        node = match (node, key) {
            (Value::Object(fields), Key::Field(name)) => fields.get_mut(name)?,
            (Value::Array(items), Key::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Navigates to the node at `path`, creating containers as needed.
fn slot<'a>(root: &'a mut Value, path: &[Key]) -> &'a mut Value {
    let mut node = root;
    for key in path {
        match key {
            Key::Field(name) => {
                if !node.is_object() {
                    *node = Value::Object(Map::new());
                }
                let Value::Object(fields) = node else {
                    unreachable!()
                };
                node = fields.entry(name.clone()).or_insert(Value::Null);
            }
            Key::Index(index) => {
                if !node.is_array() {
                    *node = Value::Array(Vec::new());
                }
                let Value::Array(items) = node else {
                    unreachable!()
                };
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                node = &mut items[*index];
            }
        }
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open() -> ReplicationSpec {
        ReplicationSpec::replicate()
    }

    #[test]
    fn new_and_deleted_properties() {
        let before = json!({ "a": 1 });
        let after = json!({ "b": 2 });

        let changes = diff(&before, &after, &open());
        assert_eq!(changes.len(), 2);
        assert!(changes.contains(&Change::New {
            path: vec!["b".into()],
            value: json!(2),
        }));
        assert!(changes.contains(&Change::Delete {
            path: vec!["a".into()],
        }));
    }

    #[test]
    fn edited_scalar_carries_prior() {
        let before = json!({ "playback": { "position": 10 } });
        let after = json!({ "playback": { "position": 42 } });

        let changes = diff(&before, &after, &open());
        assert_eq!(
            changes,
            vec![Change::Edit {
                path: vec!["playback".into(), "position".into()],
                value: json!(42),
                prior: Some(json!(10)),
            }]
        );
    }

    #[test]
    fn strip_priors_removes_old_values() {
        let mut changes = vec![Change::Edit {
            path: vec!["a".into()],
            value: json!(2),
            prior: Some(json!(1)),
        }];
        strip_priors(&mut changes);
        assert_eq!(
            changes,
            vec![Change::Edit {
                path: vec!["a".into()],
                value: json!(2),
                prior: None,
            }]
        );
    }

    #[test]
    fn excluded_subtrees_never_appear() {
        let spec = ReplicationSpec::branch([("session", ReplicationSpec::exclude())]);
        let before = json!({ "session": { "reason": null }, "users": {} });
        let after = json!({ "session": { "reason": "Kicked" }, "users": {} });

        assert!(diff(&before, &after, &spec).is_empty());
    }

    #[test]
    fn excluded_fields_pruned_from_new_subtrees() {
        let spec = ReplicationSpec::branch([(
            "mediaPlayer",
            ReplicationSpec::branch([("pendingSeek", ReplicationSpec::exclude())]),
        )]);
        let before = json!({});
        let after = json!({ "mediaPlayer": { "queue": [], "pendingSeek": 3.5 } });

        let changes = diff(&before, &after, &spec);
        assert_eq!(
            changes,
            vec![Change::New {
                path: vec!["mediaPlayer".into()],
                value: json!({ "queue": [] }),
            }]
        );
    }

    #[test]
    fn array_growth_appends_in_order() {
        let before = json!({ "queue": ["a"] });
        let after = json!({ "queue": ["a", "b", "c"] });

        let changes = diff(&before, &after, &open());
        let mut target = before.clone();
        apply(&mut target, &changes);
        assert_eq!(target, after);
    }

    #[test]
    fn array_shrink_deletes_descending() {
        let before = json!({ "queue": ["a", "b", "c"] });
        let after = json!({ "queue": ["a"] });

        let changes = diff(&before, &after, &open());
        assert_eq!(
            changes,
            vec![
                Change::Delete {
                    path: vec!["queue".into(), 2.into()],
                },
                Change::Delete {
                    path: vec!["queue".into(), 1.into()],
                },
            ]
        );

        let mut target = before.clone();
        apply(&mut target, &changes);
        assert_eq!(target, after);
    }

    #[test]
    fn round_trip_restricted_to_filter() {
        let spec = ReplicationSpec::branch([("local", ReplicationSpec::exclude())]);
        let before = json!({ "shared": { "x": 1 }, "local": { "y": 1 } });
        let after = json!({ "shared": { "x": 2 }, "local": { "y": 9 } });

        let mut target = before.clone();
        apply(&mut target, &diff(&before, &after, &spec));

        // Allowed paths reach the after state; excluded paths keep before's.
        assert_eq!(target["shared"], after["shared"]);
        assert_eq!(target["local"], before["local"]);
    }

    #[test]
    fn application_order_is_significant() {
        let insert = Change::New {
            path: vec!["x".into()],
            value: json!(1),
        };
        let delete = Change::Delete {
            path: vec!["x".into()],
        };

        let mut in_order = json!({});
        apply(&mut in_order, &[insert.clone(), delete.clone()]);
        assert_eq!(in_order, json!({}));

        let mut reversed = json!({});
        apply(&mut reversed, &[delete, insert]);
        assert_eq!(reversed, json!({ "x": 1 }));
    }

    #[test]
    fn apply_creates_missing_containers() {
        let mut target = json!({});
        apply(
            &mut target,
            &[Change::New {
                path: vec!["users".into(), "u1".into(), "name".into()],
                value: json!("sam"),
            }],
        );
        assert_eq!(target, json!({ "users": { "u1": { "name": "sam" } } }));
    }

    #[test]
    fn apply_extends_arrays_with_nulls() {
        let mut target = json!({});
        apply(
            &mut target,
            &[Change::New {
                path: vec!["queue".into(), 2.into()],
                value: json!("c"),
            }],
        );
        assert_eq!(target, json!({ "queue": [null, null, "c"] }));
    }

    #[test]
    fn apply_root_edit() {
        let mut target = json!(1);
        apply(
            &mut target,
            &[Change::Edit {
                path: vec![],
                value: json!({ "a": 1 }),
                prior: None,
            }],
        );
        assert_eq!(target, json!({ "a": 1 }));
    }

    #[test]
    fn delete_of_absent_target_is_noop() {
        let mut target = json!({ "a": 1 });
        apply(
            &mut target,
            &[Change::Delete {
                path: vec!["b".into(), "c".into()],
            }],
        );
        assert_eq!(target, json!({ "a": 1 }));
    }

    #[test]
    fn wire_shape() {
        let change = Change::Edit {
            path: vec!["queue".into(), 0.into(), "title".into()],
            value: json!("t"),
            prior: None,
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({ "kind": "edit", "path": ["queue", 0, "title"], "value": "t" })
        );

        let parsed: Change =
            serde_json::from_value(json!({ "kind": "delete", "path": ["users", "u2"] })).unwrap();
        assert_eq!(
            parsed,
            Change::Delete {
                path: vec!["users".into(), "u2".into()],
            }
        );
    }
}
