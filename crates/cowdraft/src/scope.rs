//! Production scopes.
//!
//! A [`Scope`] owns the arena of every draft state created during one
//! production. Scopes nest: a recipe that starts another production opens a
//! child scope whose drafts the outer finalizer never consumes. The
//! [`ScopeStack`] tracks which scope is current along a call chain.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::config::{Config, Settings};
use crate::error::{DraftError, DraftResult};
use crate::patch::Patch;
use crate::provider::{self, DraftProvider};
use crate::state::{DraftId, DraftState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub(crate) u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// The entry point that opened a scope. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOwner {
    Produce,
    ProduceAsync,
    CreateDraft,
    ApplyPatches,
}

#[derive(Debug, Default)]
pub(crate) struct PatchBuffer {
    pub(crate) patches: Vec<Patch>,
    pub(crate) inverse: Vec<Patch>,
}

pub struct Scope {
    id: ScopeId,
    owner: ScopeOwner,
    parent: Option<Rc<Scope>>,
    settings: Rc<Settings>,
    drafts: RefCell<Vec<DraftState>>,
    patches: RefCell<Option<PatchBuffer>>,
    can_auto_freeze: Cell<bool>,
    revoked: Cell<bool>,
}

impl Scope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn owner(&self) -> ScopeOwner {
        self.owner
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> Config {
        self.settings.config
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.get()
    }

    pub fn can_auto_freeze(&self) -> bool {
        self.can_auto_freeze.get()
    }

    pub(crate) fn disable_auto_freeze(&self) {
        self.can_auto_freeze.set(false);
    }

    pub(crate) fn provider(&self) -> &'static dyn DraftProvider {
        provider::select(self.settings.config.use_proxies)
    }

    // ── Arena ─────────────────────────────────────────────────────────────

    pub(crate) fn push_state(&self, state: DraftState) -> DraftResult<DraftId> {
        if self.revoked.get() {
            return Err(DraftError::DraftRevoked);
        }
        let mut drafts = self.drafts.borrow_mut();
        drafts.push(state);
        Ok(DraftId(drafts.len() - 1))
    }

    pub(crate) fn with_state<R>(&self, id: DraftId, f: impl FnOnce(&DraftState) -> R) -> DraftResult<R> {
        if self.revoked.get() {
            return Err(DraftError::DraftRevoked);
        }
        let drafts = self.drafts.borrow();
        drafts.get(id.0).map(f).ok_or(DraftError::DraftRevoked)
    }

    pub(crate) fn with_state_mut<R>(
        &self,
        id: DraftId,
        f: impl FnOnce(&mut DraftState) -> R,
    ) -> DraftResult<R> {
        if self.revoked.get() {
            return Err(DraftError::DraftRevoked);
        }
        let mut drafts = self.drafts.borrow_mut();
        drafts.get_mut(id.0).map(f).ok_or(DraftError::DraftRevoked)
    }

    /// A copy of a draft's state, detached from the arena.
    pub fn snapshot(&self, id: DraftId) -> DraftResult<DraftState> {
        self.with_state(id, DraftState::clone)
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.borrow().len()
    }

    // ── Patches ───────────────────────────────────────────────────────────

    /// Start collecting patches when `enabled`. Idempotent.
    pub(crate) fn use_patches(&self, enabled: bool) {
        if enabled {
            self.patches.borrow_mut().get_or_insert_with(PatchBuffer::default);
        }
    }

    pub(crate) fn has_patches(&self) -> bool {
        self.patches.borrow().is_some()
    }

    pub(crate) fn record_patches(&self, patches: Vec<Patch>, inverse: Vec<Patch>) {
        if let Some(buffer) = self.patches.borrow_mut().as_mut() {
            trace!(scope = %self.id, forward = patches.len(), inverse = inverse.len(), "recording patches");
            buffer.patches.extend(patches);
            buffer.inverse.extend(inverse);
        }
    }

    pub(crate) fn take_patches(&self) -> Option<(Vec<Patch>, Vec<Patch>)> {
        self.patches
            .borrow_mut()
            .take()
            .map(|buffer| (buffer.patches, buffer.inverse))
    }

    /// Discard every draft state. Handles into this scope fail with
    /// `DraftRevoked` from now on.
    fn discard(&self) {
        if self.revoked.replace(true) {
            return;
        }
        let count = {
            let mut drafts = self.drafts.borrow_mut();
            let count = drafts.len();
            drafts.clear();
            count
        };
        self.patches.borrow_mut().take();
        debug!(scope = %self.id, owner = ?self.owner, drafts = count, "scope revoked");
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("parent", &self.parent.as_ref().map(|p| p.id))
            .field("drafts", &self.drafts.borrow().len())
            .field("revoked", &self.revoked.get())
            .finish()
    }
}

// ── ScopeStack ────────────────────────────────────────────────────────────

/// The current-scope pointer of one production instance.
#[derive(Default)]
pub(crate) struct ScopeStack {
    current: RefCell<Option<Rc<Scope>>>,
    next_id: Cell<u64>,
}

impl ScopeStack {
    /// Open a scope nested in the current one and make it current.
    pub(crate) fn enter(&self, owner: ScopeOwner, settings: Rc<Settings>) -> Rc<Scope> {
        let id = ScopeId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let parent = self.current.borrow().clone();
        let scope = Rc::new(Scope {
            id,
            owner,
            parent,
            settings,
            drafts: RefCell::new(Vec::new()),
            patches: RefCell::new(None),
            can_auto_freeze: Cell::new(true),
            revoked: Cell::new(false),
        });
        debug!(scope = %id, ?owner, parent = ?scope.parent.as_ref().map(|p| p.id), "scope entered");
        *self.current.borrow_mut() = Some(scope.clone());
        scope
    }

    /// Make the parent of `scope` current again. `scope` must be current.
    pub(crate) fn leave(&self, scope: &Rc<Scope>) {
        let mut current = self.current.borrow_mut();
        match current.as_ref() {
            Some(top) if Rc::ptr_eq(top, scope) => {
                *current = scope.parent.clone();
                trace!(scope = %scope.id, "scope left");
            }
            top => warn!(
                scope = %scope.id,
                current = ?top.map(|s| s.id),
                "leaving a scope that is not current"
            ),
        }
    }

    /// Discard the drafts of `scope` and pop it if it is still current.
    pub(crate) fn revoke(&self, scope: &Rc<Scope>) {
        scope.discard();
        let mut current = self.current.borrow_mut();
        if current.as_ref().is_some_and(|top| Rc::ptr_eq(top, scope)) {
            *current = scope.parent.clone();
        }
    }

    pub(crate) fn current(&self) -> Option<Rc<Scope>> {
        self.current.borrow().clone()
    }
}

/// Revoke a scope that is no longer on any stack.
pub(crate) fn revoke_detached(scope: &Scope) {
    scope.discard();
}
