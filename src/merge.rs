use serde_yaml::{Mapping, Value};

/// Top-level keys that lead the final document, in this order
pub const LEADING_KEYS: [&str; 4] = ["openapi", "info", "paths", "components"];

/// Deep-merges `b` into `a`.
///
/// Keys already in `a` keep their position; keys only in `b` are appended in
/// `b`'s order. When both sides hold a mapping the two are merged
/// recursively, otherwise `b`'s value replaces `a`'s.
pub fn merge_tree(a: &mut Mapping, b: &Mapping) {
    for (key, b_value) in b {
        let Some(a_value) = a.get_mut(key) else {
            a.insert(key.clone(), b_value.clone());
            continue;
        };
        match (a_value, b_value) {
            (Value::Mapping(a_child), Value::Mapping(b_child)) => merge_tree(a_child, b_child),
            (a_value, _) => *a_value = b_value.clone(),
        }
    }
}

/// Moves the [`LEADING_KEYS`] to the front; the remaining keys follow in
/// their current order.
pub fn order_top_level(tree: Mapping) -> Mapping {
    let mut ordered = Mapping::new();
    for key in LEADING_KEYS {
        let key = Value::String(key.to_string());
        if let Some(value) = tree.get(&key) {
            ordered.insert(key, value.clone());
        }
    }
    for (key, value) in tree {
        if !ordered.contains_key(&key) {
            ordered.insert(key, value);
        }
    }
    ordered
}
