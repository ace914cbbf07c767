//! Composite nodes.
//!
//! A [`Node`] is one container plus a `frozen` flag. Nodes are shared through
//! `Rc`, so two values holding the same `Rc<Node>` are identical. A frozen node
//! never changes again; an unfrozen ("fresh") node may be edited in place
//! until something freezes it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Value;
use crate::error::{DraftError, DraftResult};
use crate::PathStep;

// ── Kind ──────────────────────────────────────────────────────────────────

/// The four composite shapes a draft can stand in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// String-keyed record, insertion ordered.
    Record,
    /// Indexed sequence.
    Sequence,
    /// Associative container keyed by strings.
    Map,
    /// Unique-element container. Members are atomic for patch purposes.
    Set,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Record => "record",
            Kind::Sequence => "sequence",
            Kind::Map => "map",
            Kind::Set => "set",
        }
    }

    /// Canonical key for this kind: string keys for records and maps,
    /// positions for sequences and sets.
    pub(crate) fn normalize(self, key: &PathStep) -> DraftResult<PathStep> {
        match self {
            Kind::Record | Kind::Map => Ok(PathStep::Key(key.to_key())),
            Kind::Sequence | Kind::Set => key
                .as_index()
                .map(PathStep::Index)
                .ok_or_else(|| DraftError::InvalidKey {
                    key: key.clone(),
                    kind: self.name(),
                }),
        }
    }

    /// Fail with `UnsupportedOperation` unless `self` is one of `allowed`.
    pub(crate) fn require(self, op: &'static str, allowed: &[Kind]) -> DraftResult<()> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(DraftError::UnsupportedOperation {
                op,
                kind: self.name(),
            })
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Container ─────────────────────────────────────────────────────────────

/// Storage of a composite node.
#[derive(Debug, Clone)]
pub enum Container {
    Record(IndexMap<String, Value>),
    Sequence(Vec<Value>),
    Map(IndexMap<String, Value>),
    Set(Vec<Value>),
}

impl Container {
    pub fn kind(&self) -> Kind {
        match self {
            Container::Record(_) => Kind::Record,
            Container::Sequence(_) => Kind::Sequence,
            Container::Map(_) => Kind::Map,
            Container::Set(_) => Kind::Set,
        }
    }

    /// An empty container of the given kind.
    pub fn empty(kind: Kind) -> Self {
        match kind {
            Kind::Record => Container::Record(IndexMap::new()),
            Kind::Sequence => Container::Sequence(Vec::new()),
            Kind::Map => Container::Map(IndexMap::new()),
            Kind::Set => Container::Set(Vec::new()),
        }
    }

    /// Build a container from canonical `(key, value)` entries.
    pub(crate) fn from_entries(kind: Kind, entries: Vec<(PathStep, Value)>) -> Self {
        match kind {
            Kind::Record => Container::Record(
                entries.into_iter().map(|(k, v)| (k.to_key(), v)).collect(),
            ),
            Kind::Map => {
                Container::Map(entries.into_iter().map(|(k, v)| (k.to_key(), v)).collect())
            }
            Kind::Sequence => Container::Sequence(entries.into_iter().map(|(_, v)| v).collect()),
            Kind::Set => Container::Set(entries.into_iter().map(|(_, v)| v).collect()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Container::Record(m) | Container::Map(m) => m.len(),
            Container::Sequence(v) | Container::Set(v) => v.len(),
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────

/// A composite value: a container and its frozen flag.
pub struct Node {
    frozen: Cell<bool>,
    data: RefCell<Container>,
}

impl Node {
    /// Wrap a container in a fresh, unfrozen node.
    pub fn new(container: Container) -> Rc<Node> {
        Rc::new(Node {
            frozen: Cell::new(false),
            data: RefCell::new(container),
        })
    }

    pub fn kind(&self) -> Kind {
        self.data.borrow().kind()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub(crate) fn set_frozen(&self) {
        self.frozen.set(true);
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the container.
    pub fn container(&self) -> Container {
        self.data.borrow().clone()
    }

    /// The child at `key`. Sets are addressed by position.
    pub fn get(&self, key: &PathStep) -> Option<Value> {
        match &*self.data.borrow() {
            Container::Record(m) | Container::Map(m) => m.get(key.to_key().as_str()).cloned(),
            Container::Sequence(v) | Container::Set(v) => key.as_index().and_then(|i| v.get(i).cloned()),
        }
    }

    pub fn contains_key(&self, key: &PathStep) -> bool {
        match &*self.data.borrow() {
            Container::Record(m) | Container::Map(m) => m.contains_key(key.to_key().as_str()),
            Container::Sequence(v) | Container::Set(v) => key.as_index().is_some_and(|i| i < v.len()),
        }
    }

    /// Canonical keys in iteration order.
    pub fn keys(&self) -> Vec<PathStep> {
        match &*self.data.borrow() {
            Container::Record(m) | Container::Map(m) => m.keys().map(PathStep::key).collect(),
            Container::Sequence(v) | Container::Set(v) => (0..v.len()).map(PathStep::Index).collect(),
        }
    }

    pub fn values(&self) -> Vec<Value> {
        match &*self.data.borrow() {
            Container::Record(m) | Container::Map(m) => m.values().cloned().collect(),
            Container::Sequence(v) | Container::Set(v) => v.clone(),
        }
    }

    /// Canonical `(key, child)` pairs in iteration order.
    pub fn entries(&self) -> Vec<(PathStep, Value)> {
        match &*self.data.borrow() {
            Container::Record(m) | Container::Map(m) => {
                m.iter().map(|(k, v)| (PathStep::key(k), v.clone())).collect()
            }
            Container::Sequence(v) | Container::Set(v) => v
                .iter()
                .enumerate()
                .map(|(i, v)| (PathStep::Index(i), v.clone()))
                .collect(),
        }
    }

    /// True when some member is identical to `value`.
    pub fn has_member(&self, value: &Value) -> bool {
        match &*self.data.borrow() {
            Container::Record(m) | Container::Map(m) => m.values().any(|v| v.is(value)),
            Container::Sequence(v) | Container::Set(v) => v.iter().any(|v| v.is(value)),
        }
    }

    // ── Unchecked edits (drafts and the finalizer) ────────────────────────

    /// Write `value` at `key`. A position equal to the length appends.
    pub(crate) fn put(&self, key: &PathStep, value: Value) -> DraftResult<()> {
        match &mut *self.data.borrow_mut() {
            Container::Record(m) | Container::Map(m) => {
                m.insert(key.to_key(), value);
                Ok(())
            }
            Container::Sequence(v) | Container::Set(v) => {
                let len = v.len();
                let index = key.as_index().ok_or_else(|| DraftError::InvalidKey {
                    key: key.clone(),
                    kind: "sequence",
                })?;
                match index.cmp(&len) {
                    std::cmp::Ordering::Less => v[index] = value,
                    std::cmp::Ordering::Equal => v.push(value),
                    std::cmp::Ordering::Greater => {
                        return Err(DraftError::IndexOutOfBounds { index, len })
                    }
                }
                Ok(())
            }
        }
    }

    /// Remove the child at `key`, keeping the order of the rest.
    pub(crate) fn take(&self, key: &PathStep) -> Option<Value> {
        match &mut *self.data.borrow_mut() {
            Container::Record(m) | Container::Map(m) => m.shift_remove(key.to_key().as_str()),
            Container::Sequence(v) | Container::Set(v) => match key.as_index() {
                Some(i) if i < v.len() => Some(v.remove(i)),
                _ => None,
            },
        }
    }

    pub(crate) fn insert_at(&self, index: usize, value: Value) -> DraftResult<()> {
        match &mut *self.data.borrow_mut() {
            Container::Sequence(v) => {
                if index > v.len() {
                    return Err(DraftError::IndexOutOfBounds { index, len: v.len() });
                }
                v.insert(index, value);
                Ok(())
            }
            other => Err(DraftError::UnsupportedOperation {
                op: "insert",
                kind: other.kind().name(),
            }),
        }
    }

    pub(crate) fn truncate(&self, len: usize) {
        match &mut *self.data.borrow_mut() {
            Container::Sequence(v) | Container::Set(v) => v.truncate(len),
            Container::Record(m) | Container::Map(m) => m.truncate(len),
        }
    }

    pub(crate) fn clear(&self) {
        self.truncate(0);
    }

    /// Append `value` to a set unless an identical member exists.
    pub(crate) fn add_member(&self, value: Value) -> bool {
        if self.has_member(&value) {
            return false;
        }
        match &mut *self.data.borrow_mut() {
            Container::Set(v) | Container::Sequence(v) => {
                v.push(value);
                true
            }
            Container::Record(_) | Container::Map(_) => false,
        }
    }

    /// Remove the member identical to `value`.
    pub(crate) fn remove_member(&self, value: &Value) -> bool {
        match &mut *self.data.borrow_mut() {
            Container::Set(v) | Container::Sequence(v) => match v.iter().position(|m| m.is(value)) {
                Some(i) => {
                    v.remove(i);
                    true
                }
                None => false,
            },
            Container::Record(_) | Container::Map(_) => false,
        }
    }

    /// An unfrozen one-level copy: children are shared, not cloned.
    pub fn shallow_copy(&self) -> Rc<Node> {
        Node::new(self.container())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.data.borrow() {
            Container::Record(m) => f.debug_map().entries(m.iter()).finish(),
            Container::Map(m) => {
                f.write_str("Map")?;
                f.debug_map().entries(m.iter()).finish()
            }
            Container::Sequence(v) => f.debug_list().entries(v.iter()).finish(),
            Container::Set(v) => {
                f.write_str("Set")?;
                f.debug_set().entries(v.iter()).finish()
            }
        }
    }
}
