use std::rc::Rc;

use tracing::trace;

use super::tracking::TrackingProvider;
use super::{check_write_index, DraftProvider};
use crate::draft::{mark_changed, Draft};
use crate::error::DraftResult;
use crate::scope::Scope;
use crate::state::DraftId;
use crate::value::{Kind, Value};
use crate::PathStep;

/// Observes overwrites of existing keys only.
///
/// New keys, deletions and truncations are staged into the copy without
/// touching `modified` or `assigned`. [`DraftProvider::will_finalize`]
/// sweeps the scope to flag drafts whose key set changed and, when patches
/// are collected, rebuilds `assigned` from a base-versus-copy diff.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepProvider;

impl DraftProvider for SweepProvider {
    fn name(&self) -> &'static str {
        "sweep"
    }

    fn write(&self, draft: &Draft, key: PathStep, value: Value) -> DraftResult<()> {
        if draft.base_has(&key)? {
            return TrackingProvider::tracked_write(draft, key, value);
        }
        check_write_index(draft, &key)?;
        draft.stage()?.put(&key, value)
    }

    fn delete(&self, draft: &Draft, key: PathStep) -> DraftResult<bool> {
        if !draft.latest_has(&key)? {
            return Ok(false);
        }
        draft.stage()?.take(&key);
        Ok(true)
    }

    fn set_len(&self, draft: &Draft, len: usize) -> DraftResult<()> {
        if len < draft.len()? {
            draft.stage()?.truncate(len);
        }
        Ok(())
    }

    fn will_finalize(&self, scope: &Rc<Scope>, result: Option<&Value>, is_replaced: bool) -> DraftResult<()> {
        if !is_replaced {
            if scope.has_patches() {
                mark_changes_recursively(scope, DraftId::ROOT)?;
            }
            mark_changes_sweep(scope)
        } else if result.and_then(Value::as_draft).is_some_and(|d| d.belongs_to(scope)) {
            mark_changes_sweep(scope)
        } else {
            Ok(())
        }
    }
}

fn key_set_changed(kind: Kind, base: &Value, copy: &Value) -> DraftResult<bool> {
    match kind {
        Kind::Sequence => Ok(base.len()? != copy.len()?),
        Kind::Record => {
            let base_keys = base.keys()?;
            let copy_keys = copy.keys()?;
            Ok(base_keys.len() != copy_keys.len() || base_keys.iter().any(|k| !copy_keys.contains(k)))
        }
        Kind::Map | Kind::Set => Ok(false),
    }
}

/// Flag every staged draft whose key set differs from its base, newest
/// first so children are seen before their parents.
fn mark_changes_sweep(scope: &Rc<Scope>) -> DraftResult<()> {
    for index in (0..scope.draft_count()).rev() {
        let id = DraftId(index);
        let (kind, modified, base, copy) =
            scope.with_state(id, |s| (s.kind, s.modified, s.base.clone(), s.copy()))?;
        let Some(copy) = copy else {
            continue;
        };
        if !modified && key_set_changed(kind, &base, &copy)? {
            trace!(scope = %scope.id(), draft = %id, "sweep found staged changes");
            mark_changed(scope, id)?;
        }
    }
    Ok(())
}

/// Rebuild `assigned` for staged additions and removals, walking down from
/// `id` through child drafts of the same scope.
fn mark_changes_recursively(scope: &Rc<Scope>, id: DraftId) -> DraftResult<()> {
    let (kind, base, copy, assigned, children) = scope.with_state(id, |s| {
        (s.kind, s.base.clone(), s.copy(), s.assigned.clone(), s.children.clone())
    })?;
    let Some(copy) = copy else {
        for (key, child) in children {
            if !assigned.contains_key(&key) {
                mark_changes_recursively(scope, child)?;
            }
        }
        return Ok(());
    };
    let descend = |value: &Value| -> DraftResult<()> {
        match value.as_draft() {
            Some(child) if child.belongs_to(scope) => mark_changes_recursively(scope, child.id()),
            _ => Ok(()),
        }
    };
    match kind {
        Kind::Record => {
            let base_keys = base.keys()?;
            for key in copy.keys()? {
                if !base_keys.contains(&key) {
                    scope.with_state_mut(id, |s| s.assigned.insert(key.clone(), true))?;
                    mark_changed(scope, id)?;
                } else if assigned.get(&key) != Some(&true) {
                    if let Some(child) = copy.get(key.clone())? {
                        descend(&child)?;
                    }
                }
            }
            let copy_keys = copy.keys()?;
            for key in base_keys {
                if !copy_keys.contains(&key) {
                    scope.with_state_mut(id, |s| s.assigned.insert(key.clone(), false))?;
                    mark_changed(scope, id)?;
                }
            }
        }
        Kind::Sequence => {
            let base_len = base.len()?;
            let copy_len = copy.len()?;
            if base_len != copy_len {
                mark_changed(scope, id)?;
            }
            scope.with_state_mut(id, |s| {
                for i in copy_len.min(base_len)..copy_len.max(base_len) {
                    s.assigned.insert(PathStep::Index(i), copy_len > base_len);
                }
            })?;
            for i in 0..copy_len.min(base_len) {
                if !assigned.contains_key(&PathStep::Index(i)) {
                    if let Some(child) = copy.get(i)? {
                        descend(&child)?;
                    }
                }
            }
        }
        // Map edits are tracked eagerly; only staged edits below them need
        // recovering. Set members are atomic.
        Kind::Map => {
            for key in copy.keys()? {
                if assigned.get(&key) != Some(&true) {
                    if let Some(child) = copy.get(key.clone())? {
                        descend(&child)?;
                    }
                }
            }
        }
        Kind::Set => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Settings};
    use crate::draft::create_draft;
    use crate::scope::{ScopeOwner, ScopeStack};
    use serde_json::json;

    fn sweep_scope() -> (ScopeStack, Rc<Scope>) {
        let stack = ScopeStack::default();
        let settings = Settings::new(Config {
            use_proxies: false,
            ..Config::default()
        });
        let scope = stack.enter(ScopeOwner::Produce, Rc::new(settings));
        (stack, scope)
    }

    #[test]
    fn additions_are_staged_then_swept() {
        let (_stack, scope) = sweep_scope();
        let draft = create_draft(&scope, Value::from(json!({"a": 1})), None).unwrap();
        draft.set("b".into(), Value::from(2)).unwrap();
        assert!(!draft.is_modified().unwrap());
        assert_eq!(draft.get(&"b".into()).unwrap(), Some(Value::from(2)));
        scope.provider().will_finalize(&scope, None, false).unwrap();
        assert!(draft.is_modified().unwrap());
    }

    #[test]
    fn overwrites_of_existing_keys_are_tracked() {
        let (_stack, scope) = sweep_scope();
        let draft = create_draft(&scope, Value::from(json!({"a": 1})), None).unwrap();
        draft.set("a".into(), Value::from(5)).unwrap();
        assert!(draft.is_modified().unwrap());
        assert_eq!(draft.state().unwrap().assigned().get(&PathStep::key("a")), Some(&true));
    }

    #[test]
    fn recursive_marking_fills_assigned() {
        let (_stack, scope) = sweep_scope();
        scope.use_patches(true);
        let draft = create_draft(&scope, Value::from(json!({"a": 1, "list": [1, 2]})), None).unwrap();
        draft.delete(&"a".into()).unwrap();
        let list = draft.get(&"list".into()).unwrap().unwrap();
        list.push(3).unwrap();
        scope.provider().will_finalize(&scope, None, false).unwrap();
        let state = draft.state().unwrap();
        assert_eq!(state.assigned().get(&PathStep::key("a")), Some(&false));
        let list_state = list.as_draft().unwrap().state().unwrap();
        assert!(list_state.is_modified());
        assert_eq!(list_state.assigned().get(&PathStep::Index(2)), Some(&true));
    }

    #[test]
    fn recursive_marking_descends_into_modified_maps() {
        let (_stack, scope) = sweep_scope();
        scope.use_patches(true);
        let base = Value::map([("k", Value::from(json!({"a": 1})))]);
        let draft = create_draft(&scope, base, None).unwrap();
        draft.set("z".into(), Value::from(5)).unwrap();
        let inner = draft.get(&"k".into()).unwrap().unwrap();
        inner.set("new", 2).unwrap();
        assert!(inner.as_draft().unwrap().state().unwrap().assigned().is_empty());
        scope.provider().will_finalize(&scope, None, false).unwrap();
        let inner_state = inner.as_draft().unwrap().state().unwrap();
        assert!(inner_state.is_modified());
        assert_eq!(inner_state.assigned().get(&PathStep::key("new")), Some(&true));
    }
}
