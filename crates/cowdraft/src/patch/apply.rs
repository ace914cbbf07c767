//! Patch replay.
//!
//! Patches are applied through the uniform mutation vocabulary, so the same
//! code edits a draft (copy-on-write) or a fresh node (in place). Values are
//! deep-cloned on the way in: the result never aliases a patch payload.

use tracing::trace;

use super::{Patch, PatchOp};
use crate::error::{DraftError, DraftResult};
use crate::value::{deep_clone, is_draftable, Kind, Value};
use crate::format_json_pointer;

fn unresolvable(patch: &Patch) -> DraftError {
    DraftError::PatchPathUnresolvable {
        path: format_json_pointer(&patch.path),
    }
}

fn payload(patch: &Patch) -> DraftResult<Value> {
    match &patch.value {
        Some(value) => deep_clone(value),
        None => Ok(Value::Null),
    }
}

/// Apply `patches` in order against `target`, which must be a draft or a
/// fresh node. Root-level operations are not handled here.
pub fn apply_to(target: &Value, patches: &[Patch]) -> DraftResult<()> {
    for patch in patches {
        apply_one(target, patch)?;
    }
    trace!(count = patches.len(), "patches applied");
    Ok(())
}

fn apply_one(target: &Value, patch: &Patch) -> DraftResult<()> {
    let Some((key, parents)) = patch.path.split_last() else {
        return Err(unresolvable(patch));
    };
    let mut parent = target.clone();
    for step in parents {
        parent = match parent.get(step.clone()) {
            Ok(Some(child)) if is_draftable(&child) => child,
            _ => return Err(unresolvable(patch)),
        };
    }
    let kind = parent.kind().ok_or_else(|| unresolvable(patch))?;
    match (patch.op, kind) {
        (PatchOp::Replace, Kind::Set) => Err(DraftError::UnsupportedPatch(format!(
            "replace at {} targets a set",
            patch.pointer()
        ))),
        (PatchOp::Replace, _) => parent.set(key.clone(), payload(patch)?),
        (PatchOp::Add, Kind::Sequence) => {
            if key.to_key() == "-" {
                return parent.push(payload(patch)?);
            }
            let index = key.as_index().ok_or_else(|| unresolvable(patch))?;
            parent.insert(index, payload(patch)?)
        }
        (PatchOp::Add, Kind::Set) => parent.add(payload(patch)?).map(drop),
        (PatchOp::Add, _) => parent.set(key.clone(), payload(patch)?),
        (PatchOp::Remove, Kind::Sequence) => {
            let index = key.as_index().ok_or_else(|| unresolvable(patch))?;
            parent.remove(index).map(drop)
        }
        (PatchOp::Remove, Kind::Set) => {
            let member = patch.value.as_ref().ok_or_else(|| {
                DraftError::UnsupportedPatch(format!("remove at {} needs the set member", patch.pointer()))
            })?;
            let found = parent.values()?.into_iter().find(|m| m == member);
            match found {
                Some(found) => parent.remove_value(&found).map(drop),
                None => Ok(()),
            }
        }
        (PatchOp::Remove, _) => parent.delete(key.clone()).map(drop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathStep;
    use serde_json::json;

    #[test]
    fn applies_against_fresh_nodes() {
        let doc = Value::from(json!({"list": [1, 3], "obj": {"a": 1}}));
        apply_to(
            &doc,
            &[
                Patch::add(vec!["list".into(), PathStep::index(1)], Value::from(2)),
                Patch::add(vec!["list".into(), "-".into()], Value::from(4)),
                Patch::remove(vec!["obj".into(), "a".into()]),
                Patch::replace(vec!["obj".into(), "b".into()], Value::from(true)),
            ],
        )
        .unwrap();
        assert_eq!(doc, json!({"list": [1, 2, 3, 4], "obj": {"b": true}}));
    }

    #[test]
    fn payloads_are_not_aliased() {
        let doc = Value::from(json!({}));
        let payload = Value::from(json!({"x": 1}));
        apply_to(&doc, &[Patch::add(vec!["p".into()], payload.clone())]).unwrap();
        assert!(!doc.at("p").unwrap().is(&payload));
        assert_eq!(doc.at("p").unwrap(), payload);
    }

    #[test]
    fn unresolvable_paths() {
        let doc = Value::from(json!({"a": 1}));
        let err = apply_to(&doc, &[Patch::add(vec!["a".into(), "b".into()], Value::Null)]);
        assert_eq!(err, Err(DraftError::PatchPathUnresolvable { path: "/a/b".into() }));
        let err = apply_to(&doc, &[Patch::remove(vec![])]);
        assert!(matches!(err, Err(DraftError::PatchPathUnresolvable { .. })));
    }

    #[test]
    fn replace_on_set_is_unsupported() {
        let doc = Value::record([("s", Value::set_of([1]))]);
        let err = apply_to(&doc, &[Patch::replace(vec!["s".into(), PathStep::index(0)], Value::from(2))]);
        assert!(matches!(err, Err(DraftError::UnsupportedPatch(_))));
    }

    #[test]
    fn set_members_are_removed_by_equality() {
        let doc = Value::record([("s", Value::set_of([Value::from(json!({"id": 1})), Value::from(2)]))]);
        apply_to(
            &doc,
            &[Patch::remove_member(vec!["s".into(), PathStep::index(0)], Value::from(json!({"id": 1})))],
        )
        .unwrap();
        assert_eq!(doc.at("s").unwrap().len().unwrap(), 1);
    }
}
