//! Finalization: turning a drafted tree into an immutable result.
//!
//! Unmodified drafts resolve to their base, so untouched branches stay
//! identical to the original. Modified drafts resolve to their copy after
//! every child has been finalized in place. Fresh nodes assigned into a
//! draft are walked too, since they may hold drafts. Drafts of another
//! scope are left unresolved and disable auto-freezing for the scope.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::draft::{latest_child, Draft};
use crate::error::{DraftError, DraftResult};
use crate::patch::{generate_patches, Patch, PatchOp};
use crate::recipe::RecipeOutput;
use crate::scope::{self, Scope};
use crate::state::{DraftId, DraftState};
use crate::value::{freeze, is_draft, is_draftable, Kind, Node, Value};
use crate::{Path, PathStep};

/// The result of closing a scope.
#[derive(Debug)]
pub(crate) struct Finished {
    /// `None` when the recipe returned [`NOTHING`](crate::NOTHING).
    pub(crate) value: Option<Value>,
    pub(crate) patches: Option<(Vec<Patch>, Vec<Patch>)>,
}

/// The draft whose copy is being walked, when walking a copy.
struct Owner<'a> {
    id: DraftId,
    state: DraftState,
    path: Option<&'a Path>,
}

pub(crate) struct Finalizer<'s> {
    scope: &'s Rc<Scope>,
    /// Drafts currently being finalized, outermost first.
    active: Vec<DraftId>,
    /// Nodes currently being walked, outermost first.
    ancestors: Vec<Rc<Node>>,
    /// Same-scope child drafts met in each draft's copy, by key.
    walked: HashMap<DraftId, Vec<(PathStep, DraftId)>>,
    /// Drafts whose patches are already recorded.
    emitted: HashSet<DraftId>,
}

impl<'s> Finalizer<'s> {
    pub(crate) fn new(scope: &'s Rc<Scope>) -> Self {
        Self {
            scope,
            active: Vec::new(),
            ancestors: Vec::new(),
            walked: HashMap::new(),
            emitted: HashSet::new(),
        }
    }

    pub(crate) fn finalize(&mut self, value: &Value, path: Option<&Path>) -> DraftResult<Value> {
        match value {
            Value::Draft(draft) => self.finalize_draft(draft, path),
            Value::Node(node) if !node.is_frozen() => {
                self.finalize_tree(node, None)?;
                Ok(value.clone())
            }
            _ => Ok(value.clone()),
        }
    }

    fn finalize_draft(&mut self, draft: &Draft, path: Option<&Path>) -> DraftResult<Value> {
        if !draft.belongs_to(self.scope) {
            return Ok(Value::Draft(draft.clone()));
        }
        let state = draft.state()?;
        if !state.modified {
            self.maybe_freeze(&state.base, true);
            return Ok(state.base);
        }
        let copy = state.copy.clone().ok_or(DraftError::DraftRevoked)?;
        if state.finalized {
            if self.active.contains(&draft.id()) {
                return Err(DraftError::CircularReferenceDetected);
            }
            // Met first under an assigned key: its own edits still need a path.
            if let Some(path) = path {
                self.emit_patches(draft.id(), path)?;
            }
            return Ok(Value::Node(copy));
        }
        draft.with_state_mut(|s| s.finalized = true)?;
        self.active.push(draft.id());
        let owner = Owner {
            id: draft.id(),
            state,
            path,
        };
        self.finalize_tree(&copy, Some(&owner))?;
        self.active.pop();

        let state = draft.state()?;
        self.run_hooks(&state)?;
        let result = Value::Node(copy);
        self.maybe_freeze(&result, false);
        if let Some(path) = path {
            if self.scope.has_patches() {
                self.emitted.insert(draft.id());
                let (patches, inverse) = generate_patches(&state, path)?;
                self.scope.record_patches(patches, inverse);
            }
        }
        trace!(scope = %self.scope.id(), draft = %draft.id(), "draft finalized");
        Ok(result)
    }

    fn finalize_tree(&mut self, node: &Rc<Node>, owner: Option<&Owner<'_>>) -> DraftResult<()> {
        if self.ancestors.iter().any(|a| Rc::ptr_eq(a, node)) {
            return Err(DraftError::CircularReferenceDetected);
        }
        self.ancestors.push(node.clone());
        let kind = node.kind();
        for (key, child) in node.entries() {
            self.finalize_property(node, kind, &key, child, owner)?;
        }
        self.ancestors.pop();
        Ok(())
    }

    fn finalize_property(
        &mut self,
        parent: &Rc<Node>,
        kind: Kind,
        key: &PathStep,
        child: Value,
        owner: Option<&Owner<'_>>,
    ) -> DraftResult<()> {
        if let Value::Node(node) = &child {
            if self.ancestors.iter().any(|a| Rc::ptr_eq(a, node)) {
                return Err(DraftError::CircularReferenceDetected);
            }
        }
        let value = match &child {
            Value::Draft(draft) => {
                let child_path = owner.and_then(|o| {
                    let assigned = o.state.assigned.get(key) == Some(&true);
                    match o.path {
                        Some(path) if kind != Kind::Set && !assigned && self.scope.has_patches() => {
                            let mut path = path.clone();
                            path.push(key.clone());
                            Some(path)
                        }
                        _ => None,
                    }
                });
                if let Some(owner) = owner {
                    if kind != Kind::Set && draft.belongs_to(self.scope) {
                        self.walked
                            .entry(owner.id)
                            .or_default()
                            .push((key.clone(), draft.id()));
                    }
                }
                let resolved = self.finalize_draft(draft, child_path.as_ref())?;
                parent.put(key, resolved.clone())?;
                if is_draft(&resolved) {
                    self.scope.disable_auto_freeze();
                }
                resolved
            }
            _ => {
                if let Some(owner) = owner {
                    if latest_child(&owner.state.base, key)?.is_some_and(|b| b.is(&child)) {
                        return Ok(());
                    }
                }
                if let Value::Node(node) = &child {
                    if !node.is_frozen() {
                        self.finalize_tree(node, None)?;
                        self.maybe_freeze(&child, false);
                    }
                }
                child
            }
        };
        if let Some(owner) = owner {
            if kind != Kind::Set {
                if let Some(on_assign) = &self.scope.settings().hooks.on_assign {
                    on_assign(&owner.state, key, &value);
                }
            }
        }
        Ok(())
    }

    /// Record patches at `path` for a draft finalized without one, then for
    /// the children it still holds at their original keys.
    fn emit_patches(&mut self, id: DraftId, path: &Path) -> DraftResult<()> {
        if !self.scope.has_patches() || !self.emitted.insert(id) {
            return Ok(());
        }
        let state = self.scope.snapshot(id)?;
        if !state.modified {
            return Ok(());
        }
        let children = self.walked.get(&id).cloned().unwrap_or_default();
        for (key, child) in children {
            if state.assigned.get(&key) != Some(&true) {
                let mut child_path = path.clone();
                child_path.push(key);
                self.emit_patches(child, &child_path)?;
            }
        }
        let (patches, inverse) = generate_patches(&state, path)?;
        self.scope.record_patches(patches, inverse);
        trace!(scope = %self.scope.id(), draft = %id, "late patches recorded");
        Ok(())
    }

    fn run_hooks(&self, state: &DraftState) -> DraftResult<()> {
        let hooks = &self.scope.settings().hooks;
        if let Some(on_delete) = &hooks.on_delete {
            if state.kind != Kind::Set {
                for key in deleted_keys(self.scope, state)? {
                    on_delete(state, &key);
                }
            }
        }
        if let Some(on_copy) = &hooks.on_copy {
            on_copy(state);
        }
        Ok(())
    }

    pub(crate) fn maybe_freeze(&self, value: &Value, deep: bool) {
        if self.scope.config().auto_freeze && self.scope.can_auto_freeze() {
            freeze(value, deep);
        }
    }
}

/// Keys removed from a draft. The sweep provider does not observe record
/// removals, so there they come from a base-versus-copy diff and a key that
/// was deleted and then re-added is never reported.
fn deleted_keys(scope: &Scope, state: &DraftState) -> DraftResult<Vec<PathStep>> {
    if !scope.config().use_proxies && state.kind == Kind::Record {
        let Some(copy) = &state.copy else {
            return Ok(Vec::new());
        };
        return Ok(state
            .base
            .keys()?
            .into_iter()
            .filter(|key| !copy.contains_key(key))
            .collect());
    }
    Ok(state
        .assigned
        .iter()
        .filter(|(_, &present)| !present)
        .map(|(key, _)| key.clone())
        .collect())
}

/// Finalize the scope of a finished recipe, then revoke it.
///
/// The scope is revoked whether finalization succeeds or fails; collected
/// patches are handed back for the caller to deliver.
pub(crate) fn process_result(scope: &Rc<Scope>, result: RecipeOutput) -> DraftResult<Finished> {
    let outcome = finish(scope, result);
    let patches = scope.take_patches();
    scope::revoke_detached(scope);
    let value = outcome?;
    debug!(
        scope = %scope.id(),
        patches = patches.as_ref().map(|(p, _)| p.len()),
        "production finished"
    );
    Ok(Finished { value, patches })
}

fn finish(scope: &Rc<Scope>, result: RecipeOutput) -> DraftResult<Option<Value>> {
    let root = Draft::new(scope.clone(), DraftId::ROOT);
    let replacement = match result {
        RecipeOutput::Unchanged => None,
        RecipeOutput::Nothing => Some(None),
        RecipeOutput::Replace(value) if value.as_draft().is_some_and(|d| d.same(&root)) => None,
        RecipeOutput::Replace(value) => Some(Some(value)),
    };
    let returned = replacement.as_ref().and_then(Option::as_ref);
    scope
        .provider()
        .will_finalize(scope, returned, replacement.is_some())?;

    let mut finalizer = Finalizer::new(scope);
    let Some(replacement) = replacement else {
        let root_path = Path::new();
        return finalizer.finalize(&Value::Draft(root), Some(&root_path)).map(Some);
    };
    if root.is_modified()? {
        return Err(DraftError::RecipeReturnedValueAndMutated);
    }
    let value = match replacement {
        Some(value) if is_draftable(&value) => {
            let value = finalizer.finalize(&value, None)?;
            finalizer.maybe_freeze(&value, false);
            Some(value)
        }
        other => other,
    };
    if scope.has_patches() {
        let base = root.original()?;
        scope.record_patches(
            vec![Patch {
                op: PatchOp::Replace,
                path: Path::new(),
                value: value.clone(),
            }],
            vec![Patch::replace(Path::new(), base)],
        );
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::draft::create_draft;
    use crate::scope::{ScopeOwner, ScopeStack};
    use crate::value::is_frozen;
    use serde_json::json;

    fn open(base: &Value) -> (ScopeStack, Rc<Scope>, Value) {
        let stack = ScopeStack::default();
        let scope = stack.enter(ScopeOwner::Produce, Rc::new(Settings::default()));
        let draft = create_draft(&scope, base.clone(), None).unwrap();
        stack.leave(&scope);
        (stack, scope, Value::Draft(draft))
    }

    #[test]
    fn untouched_draft_resolves_to_frozen_base() {
        let base = Value::from(json!({"a": {"b": 1}}));
        let (_stack, scope, draft) = open(&base);
        draft.at("a").unwrap();
        let done = process_result(&scope, RecipeOutput::Unchanged).unwrap();
        let value = done.value.unwrap();
        assert!(value.is(&base));
        assert!(is_frozen(&value.at("a").unwrap()));
        assert!(scope.is_revoked());
    }

    #[test]
    fn self_reference_is_rejected() {
        let base = Value::from(json!({"a": {}}));
        let (_stack, scope, draft) = open(&base);
        draft.at("a").unwrap().set("loop", draft.clone()).unwrap();
        let err = process_result(&scope, RecipeOutput::Unchanged).unwrap_err();
        assert_eq!(err, DraftError::CircularReferenceDetected);
        assert!(scope.is_revoked());
    }

    #[test]
    fn fresh_cycle_is_rejected() {
        let base = Value::from(json!({}));
        let (_stack, scope, draft) = open(&base);
        let fresh = Value::record([("x", 1)]);
        fresh.set("me", fresh.clone()).unwrap();
        draft.set("fresh", fresh.clone()).unwrap();
        let err = process_result(&scope, RecipeOutput::Unchanged).unwrap_err();
        assert_eq!(err, DraftError::CircularReferenceDetected);
        // break the Rc cycle built by the test
        fresh.delete("me").unwrap();
    }

    #[test]
    fn replacing_and_mutating_is_rejected() {
        let base = Value::from(json!({"a": 1}));
        let (_stack, scope, draft) = open(&base);
        draft.set("a", 2).unwrap();
        let err = process_result(&scope, RecipeOutput::Replace(Value::from(3))).unwrap_err();
        assert_eq!(err, DraftError::RecipeReturnedValueAndMutated);
    }

    #[test]
    fn nothing_yields_no_value() {
        let base = Value::from(json!([1]));
        let (_stack, scope, _draft) = open(&base);
        let done = process_result(&scope, RecipeOutput::Nothing).unwrap();
        assert!(done.value.is_none());
    }

    #[test]
    fn draft_reached_first_under_an_assigned_key_keeps_its_patches() {
        let base = Value::from(json!({"b": 0, "a": {"x": 1}}));
        let (_stack, scope, draft) = open(&base);
        scope.use_patches(true);
        let a = draft.at("a").unwrap();
        a.set("x", 2).unwrap();
        draft.set("b", a).unwrap();
        let done = process_result(&scope, RecipeOutput::Unchanged).unwrap();
        let (patches, inverse) = done.patches.unwrap();
        assert_eq!(
            patches,
            vec![
                Patch::replace(vec!["a".into(), "x".into()], Value::from(2)),
                Patch::replace(vec!["b".into()], Value::from(json!({"x": 2}))),
            ]
        );
        assert_eq!(
            inverse,
            vec![
                Patch::replace(vec!["a".into(), "x".into()], Value::from(1)),
                Patch::replace(vec!["b".into()], Value::from(0)),
            ]
        );
    }

    #[test]
    fn drafts_inside_fresh_values_are_resolved() {
        let base = Value::from(json!({"a": {"x": 1}, "list": []}));
        let (_stack, scope, draft) = open(&base);
        let a = draft.at("a").unwrap();
        draft.at("list").unwrap().push(Value::record([("inner", a)])).unwrap();
        let value = process_result(&scope, RecipeOutput::Unchanged).unwrap().value.unwrap();
        let inner = value.at("list").unwrap().at(0usize).unwrap().at("inner").unwrap();
        assert!(inner.is(&base.at("a").unwrap()));
        assert!(is_frozen(&value.at("list").unwrap().at(0usize).unwrap()));
    }
}
