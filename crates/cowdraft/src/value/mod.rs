//! The value model.
//!
//! [`Value`] is either a scalar, a composite [`Node`] or a [`Draft`] handle.
//! Composites are shared through `Rc`: cloning a `Value` never copies a
//! container, and two values are *identical* ([`Value::is`]) when they point
//! at the same node or the same draft.
//!
//! The mutation vocabulary (`set`, `delete`, `push`, `add`, ...) is uniform:
//! on a draft it is observed and staged copy-on-write, on a fresh node it
//! edits in place, and on a frozen node it fails with
//! [`DraftError::FrozenValue`].

mod equal;
mod node;
mod util;

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

pub use equal::deep_equal;
pub use node::{Container, Kind, Node};
pub use util::{deep_clone, freeze, is_draft, is_draftable, is_frozen, shallow_copy};

use crate::draft::Draft;
use crate::error::{DraftError, DraftResult};
use crate::PathStep;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Node(Rc<Node>),
    Draft(Draft),
}

// ── Construction ──────────────────────────────────────────────────────────

impl Value {
    /// A fresh record from `(key, value)` pairs.
    pub fn record<K, V, I>(entries: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map: IndexMap<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Node(Node::new(Container::Record(map)))
    }

    /// A fresh sequence.
    pub fn sequence<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Value {
        Value::Node(Node::new(Container::Sequence(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// A fresh associative container.
    pub fn map<K, V, I>(entries: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map: IndexMap<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Node(Node::new(Container::Map(map)))
    }

    /// A fresh unique-element container. Later duplicates (by identity) are
    /// dropped.
    pub fn set_of<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Value {
        let node = Node::new(Container::Set(Vec::new()));
        for item in items {
            node.add_member(item.into());
        }
        Value::Node(node)
    }
}

// ── Inspection ────────────────────────────────────────────────────────────

impl Value {
    /// Identity: same node, same draft, or equal scalars.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => Rc::ptr_eq(a, b),
            (Value::Draft(a), Value::Draft(b)) => a.same(b),
            _ => false,
        }
    }

    /// Container kind of a node or draft.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Value::Node(n) => Some(n.kind()),
            Value::Draft(d) => d.kind().ok(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Node(n) => n.kind().name(),
            Value::Draft(d) => d.kind().map(Kind::name).unwrap_or("draft"),
        }
    }

    pub fn as_draft(&self) -> Option<&Draft> {
        match self {
            Value::Draft(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Rc<Node>> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn unsupported(&self, op: &'static str) -> DraftError {
        DraftError::UnsupportedOperation {
            op,
            kind: self.type_name(),
        }
    }

    /// The node behind `self`, provided it may be edited in place.
    fn writable(&self, op: &'static str) -> DraftResult<&Rc<Node>> {
        match self {
            Value::Node(n) if n.is_frozen() => Err(DraftError::FrozenValue),
            Value::Node(n) => Ok(n),
            _ => Err(self.unsupported(op)),
        }
    }
}

// ── Uniform access ────────────────────────────────────────────────────────

const KEYED: &[Kind] = &[Kind::Record, Kind::Sequence, Kind::Map];
const MUTABLE_KEYED: &[Kind] = &[Kind::Record, Kind::Map];

impl Value {
    /// The child at `key`, or `None` when absent. Reading a draftable child
    /// of a draft returns a draft of that child.
    pub fn get(&self, key: impl Into<PathStep>) -> DraftResult<Option<Value>> {
        let key = key.into();
        match self {
            Value::Draft(d) => d.get(&key),
            Value::Node(n) => {
                let kind = n.kind();
                kind.require("get", KEYED)?;
                Ok(n.get(&kind.normalize(&key)?))
            }
            _ => Err(self.unsupported("get")),
        }
    }

    /// Like [`Value::get`] but a missing key is an error.
    pub fn at(&self, key: impl Into<PathStep>) -> DraftResult<Value> {
        let key = key.into();
        self.get(key.clone())?.ok_or(DraftError::KeyNotFound(key))
    }

    /// Write `value` at `key`. On sequences the key must be an existing
    /// position or the length.
    pub fn set(&self, key: impl Into<PathStep>, value: impl Into<Value>) -> DraftResult<()> {
        let key = key.into();
        let value = value.into();
        match self {
            Value::Draft(d) => d.set(key, value),
            _ => {
                let node = self.writable("set")?;
                let kind = node.kind();
                kind.require("set", KEYED)?;
                node.put(&kind.normalize(&key)?, value)
            }
        }
    }

    /// Remove `key` from a record or map. Returns whether it was present.
    pub fn delete(&self, key: impl Into<PathStep>) -> DraftResult<bool> {
        let key = key.into();
        match self {
            Value::Draft(d) => d.delete(&key),
            _ => {
                let node = self.writable("delete")?;
                let kind = node.kind();
                kind.require("delete", MUTABLE_KEYED)?;
                Ok(node.take(&kind.normalize(&key)?).is_some())
            }
        }
    }

    pub fn has(&self, key: impl Into<PathStep>) -> DraftResult<bool> {
        let key = key.into();
        match self {
            Value::Draft(d) => d.has(&key),
            Value::Node(n) => {
                let kind = n.kind();
                kind.require("has", KEYED)?;
                Ok(kind
                    .normalize(&key)
                    .map(|k| n.contains_key(&k))
                    .unwrap_or(false))
            }
            _ => Err(self.unsupported("has")),
        }
    }

    pub fn keys(&self) -> DraftResult<Vec<PathStep>> {
        match self {
            Value::Draft(d) => d.keys(),
            Value::Node(n) => Ok(n.keys()),
            _ => Err(self.unsupported("keys")),
        }
    }

    pub fn len(&self) -> DraftResult<usize> {
        match self {
            Value::Draft(d) => d.len(),
            Value::Node(n) => Ok(n.len()),
            _ => Err(self.unsupported("len")),
        }
    }

    pub fn is_empty(&self) -> DraftResult<bool> {
        Ok(self.len()? == 0)
    }

    // ── Sequences ─────────────────────────────────────────────────────────

    pub fn push(&self, value: impl Into<Value>) -> DraftResult<()> {
        let value = value.into();
        match self {
            Value::Draft(d) => d.push(value),
            _ => {
                let node = self.writable("push")?;
                node.kind().require("push", &[Kind::Sequence])?;
                node.put(&PathStep::Index(node.len()), value)
            }
        }
    }

    pub fn pop(&self) -> DraftResult<Option<Value>> {
        match self {
            Value::Draft(d) => d.pop(),
            _ => {
                let node = self.writable("pop")?;
                node.kind().require("pop", &[Kind::Sequence])?;
                match node.len() {
                    0 => Ok(None),
                    len => Ok(node.take(&PathStep::Index(len - 1))),
                }
            }
        }
    }

    pub fn insert(&self, index: usize, value: impl Into<Value>) -> DraftResult<()> {
        let value = value.into();
        match self {
            Value::Draft(d) => d.insert(index, value),
            _ => self.writable("insert")?.insert_at(index, value),
        }
    }

    /// Remove and return the element at `index`, shifting later elements.
    pub fn remove(&self, index: usize) -> DraftResult<Value> {
        match self {
            Value::Draft(d) => d.remove(index),
            _ => {
                let node = self.writable("remove")?;
                node.kind().require("remove", &[Kind::Sequence])?;
                let len = node.len();
                node.take(&PathStep::Index(index))
                    .ok_or(DraftError::IndexOutOfBounds { index, len })
            }
        }
    }

    pub fn truncate(&self, len: usize) -> DraftResult<()> {
        match self {
            Value::Draft(d) => d.truncate(len),
            _ => {
                let node = self.writable("truncate")?;
                node.kind().require("truncate", &[Kind::Sequence])?;
                node.truncate(len);
                Ok(())
            }
        }
    }

    // ── Sets ──────────────────────────────────────────────────────────────

    /// Add a member to a set. Returns `false` when already present.
    pub fn add(&self, value: impl Into<Value>) -> DraftResult<bool> {
        let value = value.into();
        match self {
            Value::Draft(d) => d.add(value),
            _ => {
                let node = self.writable("add")?;
                node.kind().require("add", &[Kind::Set])?;
                Ok(node.add_member(value))
            }
        }
    }

    /// Set membership by identity.
    pub fn contains(&self, value: &Value) -> DraftResult<bool> {
        match self {
            Value::Draft(d) => d.contains(value),
            Value::Node(n) => {
                n.kind().require("contains", &[Kind::Set])?;
                Ok(n.has_member(value))
            }
            _ => Err(self.unsupported("contains")),
        }
    }

    pub fn remove_value(&self, value: &Value) -> DraftResult<bool> {
        match self {
            Value::Draft(d) => d.remove_value(value),
            _ => {
                let node = self.writable("remove_value")?;
                node.kind().require("remove_value", &[Kind::Set])?;
                Ok(node.remove_member(value))
            }
        }
    }

    /// Empty a map or set.
    pub fn clear(&self) -> DraftResult<()> {
        match self {
            Value::Draft(d) => d.clear(),
            _ => {
                let node = self.writable("clear")?;
                node.kind().require("clear", &[Kind::Map, Kind::Set])?;
                node.clear();
                Ok(())
            }
        }
    }

    /// Children in iteration order. Draftable members of a draft come back
    /// as drafts.
    pub fn values(&self) -> DraftResult<Vec<Value>> {
        match self {
            Value::Draft(d) => d.values(),
            Value::Node(n) => Ok(n.values()),
            _ => Err(self.unsupported("values")),
        }
    }

    // ── JSON view ─────────────────────────────────────────────────────────

    /// A JSON rendering. Maps become objects, sets become arrays and drafts
    /// render their present state.
    pub fn to_json(&self) -> DraftResult<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Node(n) => entries_to_json(n.kind(), n.entries())?,
            Value::Draft(d) => entries_to_json(d.kind()?, d.latest_entries()?)?,
        })
    }
}

fn entries_to_json(kind: Kind, entries: Vec<(PathStep, Value)>) -> DraftResult<serde_json::Value> {
    match kind {
        Kind::Record | Kind::Map => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.to_key(), value.to_json()?);
            }
            Ok(serde_json::Value::Object(map))
        }
        Kind::Sequence | Kind::Set => entries
            .into_iter()
            .map(|(_, v)| v.to_json())
            .collect::<DraftResult<Vec<_>>>()
            .map(serde_json::Value::Array),
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::sequence(items),
            serde_json::Value::Object(map) => Value::record(map),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(Number::from(n))
            }
        })*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::sequence(items)
    }
}

impl From<Rc<Node>> for Value {
    fn from(node: Rc<Node>) -> Self {
        Value::Node(node)
    }
}

impl From<Draft> for Value {
    fn from(draft: Draft) -> Self {
        Value::Draft(draft)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        self.to_json().is_ok_and(|json| json == *other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Node(n) => fmt::Debug::fmt(&**n, f),
            Value::Draft(d) => fmt::Debug::fmt(d, f),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}
