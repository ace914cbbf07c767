//! Draft handles and the copy-on-write core.
//!
//! A [`Draft`] is a scope reference plus an arena index. Every verb routes
//! through the shared helpers here: [`Draft::read`] hands out child drafts
//! lazily, `prepare_copy` materializes the shallow copy at most once, and
//! `mark_changed` flags a draft and its ancestors as modified. Record and
//! sequence writes go through the scope's [`DraftProvider`]; maps and sets
//! have their own adapters.
//!
//! [`DraftProvider`]: crate::provider::DraftProvider

mod map;
mod sequence;
mod set;

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{DraftError, DraftResult};
use crate::scope::Scope;
use crate::state::{DraftId, DraftState};
use crate::value::{is_draftable, Container, Kind, Node, Value};
use crate::PathStep;

#[derive(Clone)]
pub struct Draft {
    pub(crate) scope: Rc<Scope>,
    pub(crate) id: DraftId,
}

// ── Identity and state ────────────────────────────────────────────────────

impl Draft {
    pub(crate) fn new(scope: Rc<Scope>, id: DraftId) -> Self {
        Self { scope, id }
    }

    pub fn id(&self) -> DraftId {
        self.id
    }

    pub fn scope(&self) -> &Rc<Scope> {
        &self.scope
    }

    pub(crate) fn same(&self, other: &Draft) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope) && self.id == other.id
    }

    pub(crate) fn belongs_to(&self, scope: &Rc<Scope>) -> bool {
        Rc::ptr_eq(&self.scope, scope)
    }

    fn sibling(&self, id: DraftId) -> Draft {
        Draft::new(self.scope.clone(), id)
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&DraftState) -> R) -> DraftResult<R> {
        self.scope.with_state(self.id, f)
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut DraftState) -> R) -> DraftResult<R> {
        self.scope.with_state_mut(self.id, f)
    }

    /// A detached copy of this draft's bookkeeping.
    pub fn state(&self) -> DraftResult<DraftState> {
        self.scope.snapshot(self.id)
    }

    pub fn kind(&self) -> DraftResult<Kind> {
        self.with_state(|s| s.kind)
    }

    pub fn is_modified(&self) -> DraftResult<bool> {
        self.with_state(|s| s.modified)
    }

    /// The value this draft shadows.
    pub fn original(&self) -> DraftResult<Value> {
        self.with_state(|s| s.base.clone())
    }

    /// A fresh, unfrozen snapshot of the present state. An unmodified draft
    /// yields its base.
    pub fn current(&self) -> DraftResult<Value> {
        let (modified, base) = self.with_state(|s| (s.modified, s.base.clone()))?;
        if !modified {
            return match base {
                Value::Draft(outer) => outer.current(),
                base => Ok(base),
            };
        }
        let entries = self
            .latest_entries()?
            .into_iter()
            .map(|(k, v)| match v {
                Value::Draft(d) => Ok((k, d.current()?)),
                v => Ok((k, v)),
            })
            .collect::<DraftResult<Vec<_>>>()?;
        Ok(Value::Node(Node::new(Container::from_entries(self.kind()?, entries))))
    }

    pub(crate) fn copy_node(&self) -> DraftResult<Option<Rc<Node>>> {
        self.with_state(|s| s.copy.clone())
    }

    // ── Latest view ───────────────────────────────────────────────────────

    /// Present entries without creating drafts: the copy, or the base with
    /// already handed-out child drafts in place.
    pub(crate) fn latest_entries(&self) -> DraftResult<Vec<(PathStep, Value)>> {
        let (copy, base, children) =
            self.with_state(|s| (s.copy.clone(), s.base.clone(), s.children.clone()))?;
        if let Some(copy) = copy {
            return Ok(copy.entries());
        }
        let mut entries = base_entries(&base)?;
        for (key, id) in children {
            if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = Value::Draft(self.sibling(id));
            }
        }
        Ok(entries)
    }

    /// The present value at a canonical key, without creating drafts.
    pub(crate) fn peek_latest(&self, key: &PathStep) -> DraftResult<Option<Value>> {
        let (copy, base, cached) =
            self.with_state(|s| (s.copy.clone(), s.base.clone(), s.children.get(key).copied()))?;
        if let Some(copy) = copy {
            return Ok(copy.get(key));
        }
        if let Some(id) = cached {
            return Ok(Some(Value::Draft(self.sibling(id))));
        }
        latest_child(&base, key)
    }

    pub(crate) fn latest_has(&self, key: &PathStep) -> DraftResult<bool> {
        match self.copy_node()? {
            Some(copy) => Ok(copy.contains_key(key)),
            None => base_has(&self.original()?, key),
        }
    }

    pub(crate) fn base_has(&self, key: &PathStep) -> DraftResult<bool> {
        base_has(&self.original()?, key)
    }

    pub(crate) fn base_len(&self) -> DraftResult<usize> {
        self.original()?.len()
    }

    // ── Reading ───────────────────────────────────────────────────────────

    /// The child at canonical `key`. A draftable child that still matches
    /// the base is wrapped in a child draft, created once and reused.
    pub(crate) fn read(&self, key: &PathStep) -> DraftResult<Option<Value>> {
        let (copy, base, finalized, cached) = self.with_state(|s| {
            (s.copy.clone(), s.base.clone(), s.finalized, s.children.get(key).copied())
        })?;
        if copy.is_none() {
            if let Some(id) = cached {
                return Ok(Some(Value::Draft(self.sibling(id))));
            }
        }
        let value = match &copy {
            Some(copy) => copy.get(key),
            None => peek(&base, key)?,
        };
        let Some(value) = value else {
            return Ok(None);
        };
        if finalized || !is_draftable(&value) {
            return Ok(Some(value));
        }
        match copy {
            Some(copy) => {
                // Assigned or already drafted: hand it out as is.
                if !peek(&base, key)?.is_some_and(|b| b.is(&value)) {
                    return Ok(Some(value));
                }
                let child = create_draft(&self.scope, value, Some(self.id))?;
                copy.put(key, Value::Draft(child.clone()))?;
                Ok(Some(Value::Draft(child)))
            }
            None => {
                let child = create_draft(&self.scope, value, Some(self.id))?;
                self.with_state_mut(|s| s.children.insert(key.clone(), child.id))?;
                Ok(Some(Value::Draft(child)))
            }
        }
    }

    /// Put the original child back at `key`, dropping the child draft that
    /// stood in for it. Leaves the draft unmodified.
    pub(crate) fn restore_child(&self, key: &PathStep, value: Value) -> DraftResult<()> {
        match self.copy_node()? {
            Some(copy) => copy.put(key, value),
            None => self.with_state_mut(|s| {
                s.children.shift_remove(key);
            }),
        }
    }

    /// Materialize the copy without marking the draft modified.
    pub(crate) fn stage(&self) -> DraftResult<Rc<Node>> {
        prepare_copy(&self.scope, self.id)
    }

    pub(crate) fn mark_changed(&self) -> DraftResult<Rc<Node>> {
        mark_changed(&self.scope, self.id)?;
        prepare_copy(&self.scope, self.id)
    }

    fn normalize(&self, key: &PathStep) -> DraftResult<(Kind, PathStep)> {
        let kind = self.kind()?;
        Ok((kind, kind.normalize(key)?))
    }
}

// ── Verbs ─────────────────────────────────────────────────────────────────

impl Draft {
    pub fn get(&self, key: &PathStep) -> DraftResult<Option<Value>> {
        let (kind, key) = self.normalize(key)?;
        kind.require("get", &[Kind::Record, Kind::Sequence, Kind::Map])?;
        self.read(&key)
    }

    pub fn set(&self, key: PathStep, value: Value) -> DraftResult<()> {
        let (kind, key) = self.normalize(&key)?;
        match kind {
            Kind::Record | Kind::Sequence => self.scope.provider().write(self, key, value),
            Kind::Map => self.map_set(key, value),
            Kind::Set => kind.require("set", &[]),
        }
    }

    pub fn delete(&self, key: &PathStep) -> DraftResult<bool> {
        let (kind, key) = self.normalize(key)?;
        match kind {
            Kind::Record => self.scope.provider().delete(self, key),
            Kind::Map => self.map_delete(&key),
            Kind::Sequence | Kind::Set => kind.require("delete", &[]).map(|_| false),
        }
    }

    pub fn has(&self, key: &PathStep) -> DraftResult<bool> {
        let kind = self.kind()?;
        kind.require("has", &[Kind::Record, Kind::Sequence, Kind::Map])?;
        match kind.normalize(key) {
            Ok(key) => self.latest_has(&key),
            Err(_) => Ok(false),
        }
    }

    pub fn keys(&self) -> DraftResult<Vec<PathStep>> {
        Ok(self.latest_entries()?.into_iter().map(|(k, _)| k).collect())
    }

    pub fn len(&self) -> DraftResult<usize> {
        match self.copy_node()? {
            Some(copy) => Ok(copy.len()),
            None => self.base_len(),
        }
    }

    pub fn is_empty(&self) -> DraftResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Children in order; draftable children come back as drafts.
    pub fn values(&self) -> DraftResult<Vec<Value>> {
        match self.kind()? {
            Kind::Set => self.set_values(),
            _ => self
                .keys()?
                .iter()
                .filter_map(|key| self.read(key).transpose())
                .collect(),
        }
    }

    pub fn clear(&self) -> DraftResult<()> {
        match self.kind()? {
            Kind::Map => self.map_clear(),
            Kind::Set => self.set_clear(),
            kind => kind.require("clear", &[]),
        }
    }
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Draft({}{})", self.scope.id(), self.id)
    }
}

// ── Core helpers ──────────────────────────────────────────────────────────

/// Children of a base without creating drafts. A base that is itself an
/// outer draft is read through its present state.
pub(crate) fn base_entries(base: &Value) -> DraftResult<Vec<(PathStep, Value)>> {
    match base {
        Value::Node(n) => Ok(n.entries()),
        Value::Draft(d) => d.latest_entries(),
        other => Err(DraftError::UnsupportedOperation {
            op: "entries",
            kind: other.type_name(),
        }),
    }
}

/// The child of a base at a canonical key. Reading through an outer draft
/// may hand out that draft's own child drafts.
pub(crate) fn peek(base: &Value, key: &PathStep) -> DraftResult<Option<Value>> {
    match base {
        Value::Node(n) => Ok(n.get(key)),
        Value::Draft(d) => match d.kind()? {
            Kind::Set => Ok(d.latest_entries()?.into_iter().find(|(k, _)| k == key).map(|(_, v)| v)),
            _ => d.read(key),
        },
        _ => Ok(None),
    }
}

/// The child of a base at a canonical key, without creating drafts.
pub(crate) fn latest_child(base: &Value, key: &PathStep) -> DraftResult<Option<Value>> {
    match base {
        Value::Node(n) => Ok(n.get(key)),
        Value::Draft(d) => d.peek_latest(key),
        _ => Ok(None),
    }
}

fn base_has(base: &Value, key: &PathStep) -> DraftResult<bool> {
    match base {
        Value::Node(n) => Ok(n.contains_key(key)),
        Value::Draft(d) => d.latest_has(key),
        _ => Ok(false),
    }
}

/// Create a draft of `base` in `scope`.
pub(crate) fn create_draft(scope: &Rc<Scope>, base: Value, parent: Option<DraftId>) -> DraftResult<Draft> {
    let kind = match &base {
        Value::Node(n) => n.kind(),
        Value::Draft(d) => d.kind()?,
        other => {
            return Err(DraftError::UnsupportedOperation {
                op: "draft",
                kind: other.type_name(),
            })
        }
    };
    let id = scope.push_state(DraftState::new(kind, base, parent, scope.id()))?;
    trace!(scope = %scope.id(), draft = %id, %kind, parent = ?parent, "draft created");
    Ok(Draft::new(scope.clone(), id))
}

/// The draft's copy, made from its base on first use.
///
/// Child drafts already handed out take their place in the copy. A set copy
/// drafts every draftable member up front so that member edits land in the
/// copy.
pub(crate) fn prepare_copy(scope: &Rc<Scope>, id: DraftId) -> DraftResult<Rc<Node>> {
    let (kind, copy, base, children) =
        scope.with_state(id, |s| (s.kind, s.copy.clone(), s.base.clone(), s.children.clone()))?;
    if let Some(copy) = copy {
        return Ok(copy);
    }
    let mut entries = base_entries(&base)?;
    if kind == Kind::Set {
        for (key, member) in entries.iter_mut() {
            if let Some(child) = children.get(key) {
                *member = Value::Draft(Draft::new(scope.clone(), *child));
            } else if is_draftable(member) {
                let child = create_draft(scope, member.clone(), Some(id))?;
                scope.with_state_mut(id, |s| s.children.insert(key.clone(), child.id))?;
                *member = Value::Draft(child);
            }
        }
    } else {
        for (key, child) in children {
            if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = Value::Draft(Draft::new(scope.clone(), child));
            }
        }
    }
    let node = Node::new(Container::from_entries(kind, entries));
    scope.with_state_mut(id, |s| s.copy = Some(node.clone()))?;
    trace!(scope = %scope.id(), draft = %id, "copy prepared");
    Ok(node)
}

/// Flag a draft and every unmodified ancestor as modified, materializing
/// their copies.
pub(crate) fn mark_changed(scope: &Rc<Scope>, id: DraftId) -> DraftResult<()> {
    let mut next = Some(id);
    while let Some(id) = next {
        let (modified, parent) = scope.with_state(id, |s| (s.modified, s.parent))?;
        if modified {
            break;
        }
        prepare_copy(scope, id)?;
        scope.with_state_mut(id, |s| s.modified = true)?;
        trace!(scope = %scope.id(), draft = %id, "draft modified");
        next = parent;
    }
    Ok(())
}
