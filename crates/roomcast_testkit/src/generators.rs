//! Property-based test generators using proptest.

use proptest::prelude::*;
use roomcast_state::ReplicationSpec;
use serde_json::Value;

/// Field names shared by tree and spec strategies, so specs overlap the
/// trees they filter.
const FIELD_NAMES: &[&str] = &["alpha", "beta", "gamma", "delta", "epsilon"];

fn field_name_strategy() -> impl Strategy<Value = String> {
    (0..FIELD_NAMES.len()).prop_map(|index| FIELD_NAMES[index].to_string())
}

/// Strategy for scalar tree leaves.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

/// Strategy for arbitrarily nested state trees.
pub fn state_tree_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

/// Strategy for state trees rooted at an object, the shape session state
/// always takes.
pub fn object_tree_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(field_name_strategy(), state_tree_strategy(), 0..4)
        .prop_map(|fields| Value::Object(fields.into_iter().collect()))
}

/// Strategy for replication specs over the shared field alphabet.
pub fn replication_spec_strategy() -> impl Strategy<Value = ReplicationSpec> {
    let leaf = any::<bool>().prop_map(ReplicationSpec::Replicate);
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop::collection::btree_map(field_name_strategy(), inner, 0..4)
            .prop_map(ReplicationSpec::Branch)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn object_trees_are_objects(tree in object_tree_strategy()) {
            prop_assert!(tree.is_object());
        }

        #[test]
        fn generated_specs_are_queryable(spec in replication_spec_strategy()) {
            // Any (spec, path, key) query answers without panicking and
            // deterministically.
            let key = "alpha".into();
            let first = spec.allows(&[], &key);
            prop_assert_eq!(spec.allows(&[], &key), first);
        }
    }
}
