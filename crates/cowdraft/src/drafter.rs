//! The production API.
//!
//! A [`Drafter`] holds settings and a scope stack. Cloning it shares both, so
//! producers and nested productions made from one instance see one current
//! scope. Each production snapshots the settings when its scope opens.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::config::{Config, Settings};
use crate::draft::{create_draft, Draft};
use crate::error::{DraftError, DraftResult};
use crate::finalize::{process_result, Finished};
use crate::patch::{apply_to, Patch, PatchOp};
use crate::producer::{Producer, Production};
use crate::recipe::RecipeOutput;
use crate::scope::{self, Scope, ScopeOwner, ScopeStack};
use crate::state::{DraftId, DraftState};
use crate::value::{deep_clone, freeze, is_draftable, Value};
use crate::PathStep;

/// A produced value with the patches that lead to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    /// `None` when the recipe returned [`NOTHING`](crate::NOTHING).
    pub value: Option<Value>,
    pub patches: Vec<Patch>,
    pub inverse_patches: Vec<Patch>,
}

impl Produced {
    fn from_finished(done: Finished) -> Self {
        let (patches, inverse_patches) = done.patches.unwrap_or_default();
        Self {
            value: done.value,
            patches,
            inverse_patches,
        }
    }
}

#[derive(Default)]
struct Inner {
    settings: RefCell<Rc<Settings>>,
    scopes: ScopeStack,
}

#[derive(Clone, Default)]
pub struct Drafter {
    inner: Rc<Inner>,
}

impl fmt::Debug for Drafter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drafter")
            .field("settings", &*self.inner.settings.borrow())
            .field("current_scope", &self.inner.scopes.current().map(|s| s.id()))
            .finish()
    }
}

// ── Configuration ─────────────────────────────────────────────────────────

impl Drafter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        let drafter = Self::default();
        drafter.update(|s| s.config = config);
        drafter
    }

    pub fn config(&self) -> Config {
        self.inner.settings.borrow().config
    }

    fn settings(&self) -> Rc<Settings> {
        self.inner.settings.borrow().clone()
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut settings = self.inner.settings.borrow_mut();
        f(Rc::make_mut(&mut settings));
    }

    /// Freeze produced values. On by default.
    pub fn set_auto_freeze(&self, enabled: bool) {
        self.update(|s| s.config.auto_freeze = enabled);
    }

    /// Choose the tracking provider (`true`) or the sweep provider.
    pub fn set_use_proxies(&self, enabled: bool) {
        self.update(|s| s.config.use_proxies = enabled);
    }

    pub fn on_assign(&self, hook: impl Fn(&DraftState, &PathStep, &Value) + 'static) {
        self.update(|s| s.hooks.on_assign = Some(Rc::new(hook)));
    }

    pub fn on_delete(&self, hook: impl Fn(&DraftState, &PathStep) + 'static) {
        self.update(|s| s.hooks.on_delete = Some(Rc::new(hook)));
    }

    pub fn on_copy(&self, hook: impl Fn(&DraftState) + 'static) {
        self.update(|s| s.hooks.on_copy = Some(Rc::new(hook)));
    }

    pub fn clear_hooks(&self) {
        self.update(|s| s.hooks = Default::default());
    }

    /// The innermost open scope, if a recipe is running.
    pub fn current_scope(&self) -> Option<Rc<Scope>> {
        self.inner.scopes.current()
    }
}

// ── Producing ─────────────────────────────────────────────────────────────

impl Drafter {
    /// Run `recipe` against a draft of `base` and return the next value.
    ///
    /// The recipe may mutate its draft, return a replacement, or return
    /// [`NOTHING`](crate::NOTHING) to produce no value. A base that cannot be
    /// drafted is handed to the recipe as is.
    pub fn produce<F, R>(&self, base: impl Into<Value>, recipe: F) -> DraftResult<Option<Value>>
    where
        F: FnOnce(Value) -> DraftResult<R>,
        R: Into<RecipeOutput>,
    {
        self.run(ScopeOwner::Produce, base.into(), recipe, false)
            .map(|done| done.value)
    }

    /// Like [`Drafter::produce`], delivering patches to `listener`.
    pub fn produce_with_listener<F, R, L>(&self, base: impl Into<Value>, recipe: F, listener: L) -> DraftResult<Option<Value>>
    where
        F: FnOnce(Value) -> DraftResult<R>,
        R: Into<RecipeOutput>,
        L: FnOnce(Vec<Patch>, Vec<Patch>),
    {
        let done = Produced::from_finished(self.run(ScopeOwner::Produce, base.into(), recipe, true)?);
        listener(done.patches, done.inverse_patches);
        Ok(done.value)
    }

    pub fn produce_with_patches<F, R>(&self, base: impl Into<Value>, recipe: F) -> DraftResult<Produced>
    where
        F: FnOnce(Value) -> DraftResult<R>,
        R: Into<RecipeOutput>,
    {
        self.run(ScopeOwner::Produce, base.into(), recipe, true)
            .map(Produced::from_finished)
    }

    /// Produce with a recipe that finishes later.
    ///
    /// The scope is left before the recipe is awaited, so its drafts stay
    /// usable while suspended; finalization waits for the recipe to resolve.
    /// A failed recipe revokes the scope.
    pub async fn produce_async<F, Fut, R>(&self, base: impl Into<Value>, recipe: F) -> DraftResult<Option<Value>>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = DraftResult<R>>,
        R: Into<RecipeOutput>,
    {
        self.run_async(base.into(), recipe, false)
            .await
            .map(|done| done.value)
    }

    pub async fn produce_async_with_patches<F, Fut, R>(&self, base: impl Into<Value>, recipe: F) -> DraftResult<Produced>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = DraftResult<R>>,
        R: Into<RecipeOutput>,
    {
        self.run_async(base.into(), recipe, true)
            .await
            .map(Produced::from_finished)
    }

    /// A reusable producer bound to `recipe`.
    pub fn producer<A, F, R>(&self, recipe: F) -> Producer<A, F>
    where
        F: Fn(Value, A) -> DraftResult<R>,
        R: Into<RecipeOutput>,
    {
        Producer::new(self.clone(), recipe)
    }

    /// A production assembled step by step.
    pub fn production(&self) -> Production<'_> {
        Production::new(self.clone())
    }

    pub(crate) fn run<F, R>(&self, owner: ScopeOwner, base: Value, recipe: F, with_patches: bool) -> DraftResult<Finished>
    where
        F: FnOnce(Value) -> DraftResult<R>,
        R: Into<RecipeOutput>,
    {
        if !is_draftable(&base) {
            let output = recipe(base.clone())?.into();
            return Ok(self.finish_plain(base, output, with_patches));
        }
        let scope = self.inner.scopes.enter(owner, self.settings());
        let root = match create_draft(&scope, base, None) {
            Ok(root) => root,
            Err(err) => {
                self.inner.scopes.revoke(&scope);
                return Err(err);
            }
        };
        let output = match recipe(Value::Draft(root)) {
            Ok(output) => output.into(),
            Err(err) => {
                self.inner.scopes.revoke(&scope);
                return Err(err);
            }
        };
        self.inner.scopes.leave(&scope);
        scope.use_patches(with_patches);
        process_result(&scope, output)
    }

    async fn run_async<F, Fut, R>(&self, base: Value, recipe: F, with_patches: bool) -> DraftResult<Finished>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = DraftResult<R>>,
        R: Into<RecipeOutput>,
    {
        if !is_draftable(&base) {
            let output = recipe(base.clone()).await?.into();
            return Ok(self.finish_plain(base, output, with_patches));
        }
        let scope = self.inner.scopes.enter(ScopeOwner::ProduceAsync, self.settings());
        let root = match create_draft(&scope, base, None) {
            Ok(root) => root,
            Err(err) => {
                self.inner.scopes.revoke(&scope);
                return Err(err);
            }
        };
        let pending = recipe(Value::Draft(root));
        self.inner.scopes.leave(&scope);
        // Dropping this future while suspended revokes the scope too.
        let guard = RevokeOnDrop(scope);
        let output = pending.await?;
        guard.0.use_patches(with_patches);
        process_result(&guard.0, output.into())
    }

    /// The result of a recipe run directly against a non-draftable base.
    fn finish_plain(&self, base: Value, output: RecipeOutput, with_patches: bool) -> Finished {
        let value = match output {
            RecipeOutput::Unchanged => Some(base.clone()),
            RecipeOutput::Replace(value) => Some(value),
            RecipeOutput::Nothing => None,
        };
        if let Some(value) = &value {
            if self.config().auto_freeze {
                freeze(value, true);
            }
        }
        let patches = with_patches.then(|| match &value {
            Some(value) if value.is(&base) => (Vec::new(), Vec::new()),
            _ => (
                vec![Patch {
                    op: PatchOp::Replace,
                    path: Vec::new(),
                    value: value.clone(),
                }],
                vec![Patch::replace(Vec::new(), base)],
            ),
        });
        Finished { value, patches }
    }
}

// ── Manual drafts ─────────────────────────────────────────────────────────

impl Drafter {
    /// Open a draft outside any recipe. Finish it with
    /// [`Drafter::finish_draft`] or drop it with [`Drafter::discard_draft`].
    /// Child drafts held in a copy point back at the scope, so a draft that
    /// is neither finished nor discarded keeps its arena alive.
    ///
    /// A draft passed as `base` is snapshotted first, so the new draft does
    /// not depend on the other draft's scope.
    pub fn create_draft(&self, base: impl Into<Value>) -> DraftResult<Value> {
        let base = match base.into() {
            Value::Draft(draft) => draft.current()?,
            base if is_draftable(&base) => base,
            _ => {
                return Err(DraftError::InvalidManualDraftArgument(
                    "create_draft expects a record, sequence, map or set",
                ))
            }
        };
        let scope = self.inner.scopes.enter(ScopeOwner::CreateDraft, self.settings());
        let draft = create_draft(&scope, base, None).and_then(|draft| {
            draft.with_state_mut(|s| s.manual = true)?;
            Ok(draft)
        });
        self.inner.scopes.leave(&scope);
        draft.map(Value::Draft)
    }

    pub fn finish_draft(&self, draft: &Value) -> DraftResult<Option<Value>> {
        self.finish(draft, false).map(|done| done.value)
    }

    pub fn finish_draft_with_listener<L>(&self, draft: &Value, listener: L) -> DraftResult<Option<Value>>
    where
        L: FnOnce(Vec<Patch>, Vec<Patch>),
    {
        let done = Produced::from_finished(self.finish(draft, true)?);
        listener(done.patches, done.inverse_patches);
        Ok(done.value)
    }

    pub fn finish_draft_with_patches(&self, draft: &Value) -> DraftResult<Produced> {
        self.finish(draft, true).map(Produced::from_finished)
    }

    /// Abandon a manual draft without producing anything. Its handles fail
    /// with `DraftRevoked` from now on.
    pub fn discard_draft(&self, draft: &Value) -> DraftResult<()> {
        let draft = manual_root(draft)?;
        scope::revoke_detached(draft.scope());
        Ok(())
    }

    fn finish(&self, draft: &Value, with_patches: bool) -> DraftResult<Finished> {
        let draft = manual_root(draft)?;
        let scope = draft.scope();
        if scope.is_revoked() {
            return Err(DraftError::DraftAlreadyFinalized);
        }
        if draft.with_state(|s| s.finalized)? {
            return Err(DraftError::DraftAlreadyFinalized);
        }
        scope.use_patches(with_patches);
        process_result(scope, RecipeOutput::Unchanged)
    }
}

/// Revokes a scope when dropped. Revoking an already revoked scope is a
/// no-op, so a finished production is unaffected.
struct RevokeOnDrop(Rc<Scope>);

impl Drop for RevokeOnDrop {
    fn drop(&mut self) {
        scope::revoke_detached(&self.0);
    }
}

fn manual_root(value: &Value) -> DraftResult<&Draft> {
    const NOT_MANUAL: &str = "finish_draft expects a draft returned by create_draft";
    let Value::Draft(draft) = value else {
        return Err(DraftError::InvalidManualDraftArgument(NOT_MANUAL));
    };
    if draft.scope().is_revoked() {
        return Err(DraftError::DraftAlreadyFinalized);
    }
    let manual = draft.with_state(|s| s.manual)?;
    if !manual || draft.id() != DraftId::ROOT {
        return Err(DraftError::InvalidManualDraftArgument(NOT_MANUAL));
    }
    Ok(draft)
}

// ── Patches ───────────────────────────────────────────────────────────────

impl Drafter {
    /// Replay `patches` on `base`.
    ///
    /// The last root-level `replace` supersedes everything before it. A draft
    /// is patched in place; any other base goes through a production, so the
    /// result shares every untouched branch with `base`.
    pub fn apply_patches(&self, base: impl Into<Value>, patches: &[Patch]) -> DraftResult<Value> {
        let mut base = base.into();
        let mut rest = patches;
        if let Some(index) = patches.iter().rposition(Patch::is_root_replace) {
            base = match &patches[index].value {
                Some(value) => deep_clone(value)?,
                None => Value::Null,
            };
            rest = &patches[index + 1..];
        }
        if let Value::Draft(_) = base {
            apply_to(&base, rest)?;
            return Ok(base);
        }
        let done = self.run(ScopeOwner::ApplyPatches, base, |draft| apply_to(&draft, rest), false)?;
        Ok(done.value.unwrap_or_default())
    }
}
