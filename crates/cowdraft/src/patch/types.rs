//! Patch operation types.

use serde::{Deserialize, Deserializer, Serialize};

use crate::value::Value;
use crate::{format_json_pointer, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

impl PatchOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Replace => "replace",
            PatchOp::Remove => "remove",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "add" => Some(PatchOp::Add),
            "replace" => Some(PatchOp::Replace),
            "remove" => Some(PatchOp::Remove),
            _ => None,
        }
    }
}

/// One structural edit.
///
/// `value` is present for `add` and `replace`. A `remove` on a
/// unique-element container carries the removed member, since set positions
/// are not stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: Path,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub value: Option<Value>,
}

/// A field that is present is `Some`, even when it is `null`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Patch {
    pub fn add(path: Path, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path,
            value: Some(value),
        }
    }

    pub fn replace(path: Path, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path,
            value: Some(value),
        }
    }

    pub fn remove(path: Path) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }

    /// A set member removal, carrying the member.
    pub fn remove_member(path: Path, value: Value) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: Some(value),
        }
    }

    /// The path as a JSON Pointer.
    pub fn pointer(&self) -> String {
        format_json_pointer(&self.path)
    }

    pub fn is_root_replace(&self) -> bool {
        self.op == PatchOp::Replace && self.path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathStep;
    use serde_json::json;

    #[test]
    fn serde_shape() {
        let patch = Patch::add(vec![PathStep::key("a"), PathStep::index(0)], Value::from(1));
        let encoded = serde_json::to_value(&patch).unwrap();
        assert_eq!(encoded, json!({"op": "add", "path": ["a", 0], "value": 1}));
        let encoded = serde_json::to_value(Patch::remove(vec![PathStep::index(3)])).unwrap();
        assert_eq!(encoded, json!({"op": "remove", "path": [3]}));
    }

    #[test]
    fn explicit_null_value_is_kept() {
        let patch: Patch =
            serde_json::from_value(json!({"op": "replace", "path": ["a"], "value": null})).unwrap();
        assert_eq!(patch.value, Some(Value::Null));
        let patch: Patch = serde_json::from_value(json!({"op": "remove", "path": ["a"]})).unwrap();
        assert_eq!(patch.value, None);
    }

    #[test]
    fn pointer_rendering() {
        let patch = Patch::remove(vec![PathStep::key("a/b"), PathStep::index(2)]);
        assert_eq!(patch.pointer(), "/a~1b/2");
        assert!(Patch::replace(vec![], Value::Null).is_root_replace());
    }
}
