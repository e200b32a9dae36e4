//! Local `$ref` inlining for plain documents.

use std::collections::HashSet;

use serde_json::{Map, Value};
use unicontract_telemetry::log_reference_unresolved;

use crate::access::{FieldResolver, Node};

/// Look up a local JSON pointer (`#/a/b`) in `root`.
pub fn resolve_pointer<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let path = reference.strip_prefix("#/")?;
    let mut current = root;
    for segment in path.split('/') {
        let unescaped = segment.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Array(items) => items.get(unescaped.parse::<usize>().ok()?)?,
            other => other.get(&unescaped)?,
        };
    }
    Some(current)
}

/// Inline every local `$ref` in `root`.
///
/// Circular, external and dangling references stay in place as the `$ref`
/// object, so the result is always a finite tree.
pub fn dereference(root: &Value) -> Value {
    let mut visited = HashSet::new();
    inline(root, root, &mut visited)
}

fn inline(value: &Value, root: &Value, visited: &mut HashSet<String>) -> Value {
    match value {
        Value::Object(obj) => match obj.get("$ref").and_then(Value::as_str) {
            Some(reference) => inline_reference(obj, reference, root, visited),
            None => Value::Object(
                obj.iter()
                    .map(|(key, child)| (key.clone(), inline(child, root, visited)))
                    .collect(),
            ),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| inline(item, root, visited))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn inline_reference(
    obj: &Map<String, Value>,
    reference: &str,
    root: &Value,
    visited: &mut HashSet<String>,
) -> Value {
    if visited.contains(reference) {
        log_reference_unresolved!(reference = reference, reason = "circular", "$ref kept in place");
        return Value::Object(obj.clone());
    }
    let Some(target) = resolve_pointer(root, reference) else {
        let reason = if reference.starts_with("#/") {
            "dangling"
        } else {
            "external"
        };
        log_reference_unresolved!(reference = reference, reason = reason, "$ref kept in place");
        return Value::Object(obj.clone());
    };

    visited.insert(reference.to_string());
    let mut resolved = inline(target, root, visited);
    visited.remove(reference);

    // Sibling keys next to `$ref` override the target's.
    if let Value::Object(target_obj) = &mut resolved {
        for (key, child) in obj {
            if key != "$ref" {
                target_obj.insert(key.clone(), inline(child, root, visited));
            }
        }
    }
    resolved
}

/// True when `node` is an unresolved `$ref` object.
pub fn is_reference(node: &Node) -> bool {
    matches!(node.resolve("$ref"), Ok(Some(_)))
}
