//! Per-draft bookkeeping.
//!
//! A [`DraftState`] is plain data. It lives in its scope's arena and is
//! addressed by a [`DraftId`]; draft handles carry the id, never a reference
//! to the state itself.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::scope::ScopeId;
use crate::value::{Kind, Node, Value};
use crate::PathStep;

/// Index of a draft state in its scope's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DraftId(pub(crate) usize);

impl DraftId {
    pub const ROOT: DraftId = DraftId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
pub struct DraftState {
    pub(crate) kind: Kind,
    /// The node this draft shadows, or a draft of an enclosing scope.
    pub(crate) base: Value,
    pub(crate) copy: Option<Rc<Node>>,
    pub(crate) parent: Option<DraftId>,
    pub(crate) scope: ScopeId,
    pub(crate) modified: bool,
    pub(crate) finalized: bool,
    pub(crate) manual: bool,
    /// `true` for keys written, `false` for keys removed. Untouched keys are
    /// absent.
    pub(crate) assigned: IndexMap<PathStep, bool>,
    /// Child drafts handed out before `copy` existed, by canonical key (base
    /// position for sets).
    pub(crate) children: IndexMap<PathStep, DraftId>,
}

impl DraftState {
    pub(crate) fn new(kind: Kind, base: Value, parent: Option<DraftId>, scope: ScopeId) -> Self {
        Self {
            kind,
            base,
            copy: None,
            parent,
            scope,
            modified: false,
            finalized: false,
            manual: false,
            assigned: IndexMap::new(),
            children: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn base(&self) -> &Value {
        &self.base
    }

    /// The working copy, once one has been made.
    pub fn copy(&self) -> Option<Value> {
        self.copy.clone().map(Value::Node)
    }

    pub fn parent(&self) -> Option<DraftId> {
        self.parent
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn assigned(&self) -> &IndexMap<PathStep, bool> {
        &self.assigned
    }

    /// The copy when present, the base otherwise.
    pub fn latest(&self) -> Value {
        self.copy().unwrap_or_else(|| self.base.clone())
    }
}

impl fmt::Debug for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftState")
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("parent", &self.parent)
            .field("modified", &self.modified)
            .field("finalized", &self.finalized)
            .field("manual", &self.manual)
            .field("assigned", &self.assigned)
            .finish_non_exhaustive()
    }
}
