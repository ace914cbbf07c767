//! Classification, copying and freezing.

use super::{Container, Node, Value};
use crate::error::DraftResult;

/// True for composites and drafts: the values a production can draft.
pub fn is_draftable(value: &Value) -> bool {
    matches!(value, Value::Node(_) | Value::Draft(_))
}

pub fn is_draft(value: &Value) -> bool {
    matches!(value, Value::Draft(_))
}

/// Scalars are always frozen; drafts never are.
pub fn is_frozen(value: &Value) -> bool {
    match value {
        Value::Node(n) => n.is_frozen(),
        Value::Draft(_) => false,
        _ => true,
    }
}

/// An unfrozen one-level copy. Children are shared with the source; a
/// draft is copied from its present state.
pub fn shallow_copy(value: &Value) -> DraftResult<Value> {
    Ok(match value {
        Value::Node(n) => Value::Node(n.shallow_copy()),
        Value::Draft(d) => Value::Node(Node::new(Container::from_entries(
            d.kind()?,
            d.latest_entries()?,
        ))),
        other => other.clone(),
    })
}

/// A fully independent, unfrozen copy. Drafts are read through their
/// present state, so the result never contains a draft.
///
/// # Examples
///
/// ```
/// use cowdraft::value::{deep_clone, Value};
/// use serde_json::json;
///
/// let original = Value::from(json!({"foo": [1, 2, 3]}));
/// let cloned = deep_clone(&original).unwrap();
///
/// assert_eq!(original, cloned);
/// assert!(!original.is(&cloned));
/// ```
pub fn deep_clone(value: &Value) -> DraftResult<Value> {
    let (kind, entries) = match value {
        Value::Node(n) => (n.kind(), n.entries()),
        Value::Draft(d) => (d.kind()?, d.latest_entries()?),
        other => return Ok(other.clone()),
    };
    let entries = entries
        .into_iter()
        .map(|(k, v)| Ok((k, deep_clone(&v)?)))
        .collect::<DraftResult<Vec<_>>>()?;
    Ok(Value::Node(Node::new(Container::from_entries(kind, entries))))
}

/// Freeze a node, and with `deep` every unfrozen node below it. Drafts are
/// left alone.
pub fn freeze(value: &Value, deep: bool) {
    let Value::Node(node) = value else {
        return;
    };
    if node.is_frozen() {
        return;
    }
    node.set_frozen();
    if deep {
        for child in node.values() {
            freeze(&child, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shallow_copy_shares_children() {
        let value = Value::from(json!({"a": {"b": 1}}));
        let copy = shallow_copy(&value).unwrap();
        assert!(!copy.is(&value));
        assert!(copy.at("a").unwrap().is(&value.at("a").unwrap()));
    }

    #[test]
    fn deep_clone_is_unfrozen_and_unshared() {
        let value = Value::from(json!({"a": {"b": 1}}));
        freeze(&value, true);
        let cloned = deep_clone(&value).unwrap();
        assert!(!is_frozen(&cloned));
        assert!(!cloned.at("a").unwrap().is(&value.at("a").unwrap()));
        assert_eq!(cloned, value);
    }

    #[test]
    fn shallow_freeze_leaves_children() {
        let value = Value::from(json!({"a": {"b": 1}}));
        freeze(&value, false);
        assert!(is_frozen(&value));
        assert!(!is_frozen(&value.at("a").unwrap()));
        freeze(&value, true);
        // already frozen at the top: children are not revisited
        assert!(!is_frozen(&value.at("a").unwrap()));
    }

    #[test]
    fn classification() {
        assert!(is_draftable(&Value::sequence([1])));
        assert!(!is_draftable(&Value::from("s")));
        assert!(is_frozen(&Value::from(1)));
        assert!(!is_draft(&Value::Null));
    }
}
