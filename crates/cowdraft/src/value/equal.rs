use super::{Kind, Value};
use crate::PathStep;

/// Structural equality over values.
///
/// Drafts compare by their present state. Records and maps compare key by
/// key regardless of order; sets compare by membership; a record never
/// equals a map and a sequence never equals a set.
///
/// # Examples
///
/// ```
/// use cowdraft::value::{deep_equal, Value};
/// use serde_json::json;
///
/// let a = Value::from(json!({"foo": [1, 2, 3]}));
/// let b = Value::from(json!({"foo": [1, 2, 3]}));
/// let c = Value::from(json!({"foo": [1, 2, 4]}));
///
/// assert!(deep_equal(&a, &b));
/// assert!(!deep_equal(&a, &c));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    if a.is(b) {
        return true;
    }
    let (Some((kind_a, entries_a)), Some((kind_b, entries_b))) = (view(a), view(b)) else {
        return false;
    };
    if kind_a != kind_b || entries_a.len() != entries_b.len() {
        return false;
    }
    match kind_a {
        Kind::Sequence => entries_a
            .iter()
            .zip(entries_b.iter())
            .all(|((_, x), (_, y))| deep_equal(x, y)),
        Kind::Record | Kind::Map => entries_a.iter().all(|(key, x)| {
            entries_b
                .iter()
                .find(|(k, _)| k == key)
                .is_some_and(|(_, y)| deep_equal(x, y))
        }),
        Kind::Set => entries_a
            .iter()
            .all(|(_, x)| entries_b.iter().any(|(_, y)| deep_equal(x, y))),
    }
}

/// Kind and present entries of a composite; `None` for scalars and for
/// drafts whose scope is gone.
fn view(value: &Value) -> Option<(Kind, Vec<(PathStep, Value)>)> {
    match value {
        Value::Node(n) => Some((n.kind(), n.entries())),
        Value::Draft(d) => Some((d.kind().ok()?, d.latest_entries().ok()?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert!(deep_equal(&Value::Null, &Value::Null));
        assert!(deep_equal(&Value::from(1), &Value::from(1)));
        assert!(!deep_equal(&Value::from(1), &Value::from("1")));
    }

    #[test]
    fn record_key_order_is_ignored() {
        let a = Value::from(json!({"a": 1, "b": 2}));
        let b = Value::from(json!({"b": 2, "a": 1}));
        assert!(deep_equal(&a, &b));
    }

    #[test]
    fn kinds_must_match() {
        let record = Value::record([("a", 1)]);
        let map = Value::map([("a", 1)]);
        assert!(!deep_equal(&record, &map));
        assert!(!deep_equal(&Value::sequence([1]), &Value::set_of([1])));
    }

    #[test]
    fn sets_ignore_order() {
        let a = Value::set_of([1, 2, 3]);
        let b = Value::set_of([3, 1, 2]);
        assert!(deep_equal(&a, &b));
        assert!(!deep_equal(&a, &Value::set_of([1, 2, 4])));
    }
}
