//! Curried producers and the production builder.

use std::marker::PhantomData;

use crate::drafter::{Drafter, Produced};
use crate::error::{DraftError, DraftResult};
use crate::patch::{Patch, PatchListener};
use crate::recipe::RecipeOutput;
use crate::scope::ScopeOwner;
use crate::value::Value;

/// A recipe bound ahead of its base.
///
/// Extra arguments reach the recipe as `A`; use a tuple for several and `()`
/// for none.
///
/// ```
/// use cowdraft::{Drafter, Value};
/// use serde_json::json;
///
/// let drafter = Drafter::new();
/// let bump = drafter
///     .producer(|draft: Value, by: i64| {
///         let n = draft.at("n")?.as_i64().unwrap_or(0);
///         draft.set("n", n + by)
///     })
///     .with_default(json!({"n": 0}));
///
/// let next = bump.produce(json!({"n": 1}), 2).unwrap().unwrap();
/// assert_eq!(next, json!({"n": 3}));
/// assert_eq!(bump.produce_default(5).unwrap().unwrap(), json!({"n": 5}));
/// ```
pub struct Producer<A, F> {
    drafter: Drafter,
    recipe: F,
    default_base: Option<Value>,
    _args: PhantomData<fn(A)>,
}

impl<A, F> Producer<A, F> {
    pub(crate) fn new(drafter: Drafter, recipe: F) -> Self {
        Self {
            drafter,
            recipe,
            default_base: None,
            _args: PhantomData,
        }
    }

    /// The base used by [`Producer::produce_default`].
    pub fn with_default(mut self, base: impl Into<Value>) -> Self {
        self.default_base = Some(base.into());
        self
    }

    pub fn default_base(&self) -> Option<&Value> {
        self.default_base.as_ref()
    }

    pub fn produce<R>(&self, base: impl Into<Value>, args: A) -> DraftResult<Option<Value>>
    where
        F: Fn(Value, A) -> DraftResult<R>,
        R: Into<RecipeOutput>,
    {
        self.drafter.produce(base, |draft| (self.recipe)(draft, args))
    }

    /// Produce from the default base, or from `null` when none was set.
    pub fn produce_default<R>(&self, args: A) -> DraftResult<Option<Value>>
    where
        F: Fn(Value, A) -> DraftResult<R>,
        R: Into<RecipeOutput>,
    {
        self.produce(self.default_base.clone().unwrap_or_default(), args)
    }

    pub fn produce_with_patches<R>(&self, base: impl Into<Value>, args: A) -> DraftResult<Produced>
    where
        F: Fn(Value, A) -> DraftResult<R>,
        R: Into<RecipeOutput>,
    {
        self.drafter
            .produce_with_patches(base, |draft| (self.recipe)(draft, args))
    }
}

// ── Production ────────────────────────────────────────────────────────────

type BoxedRecipe<'a> = Box<dyn FnOnce(Value) -> DraftResult<RecipeOutput> + 'a>;

/// A production assembled step by step.
///
/// [`Production::run`] rejects a missing recipe and a patch listener
/// combined with [`Production::collect_patches`].
pub struct Production<'a> {
    drafter: Drafter,
    base: Value,
    recipe: Option<BoxedRecipe<'a>>,
    listener: Option<PatchListener>,
    collect: bool,
}

impl<'a> Production<'a> {
    pub(crate) fn new(drafter: Drafter) -> Self {
        Self {
            drafter,
            base: Value::Null,
            recipe: None,
            listener: None,
            collect: false,
        }
    }

    pub fn base(mut self, base: impl Into<Value>) -> Self {
        self.base = base.into();
        self
    }

    pub fn recipe<F, R>(mut self, recipe: F) -> Self
    where
        F: FnOnce(Value) -> DraftResult<R> + 'a,
        R: Into<RecipeOutput>,
    {
        self.recipe = Some(Box::new(move |draft| recipe(draft).map(Into::into)));
        self
    }

    pub fn listener(mut self, listener: impl FnOnce(Vec<Patch>, Vec<Patch>) + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Return patches in the [`Produced`] result.
    pub fn collect_patches(mut self) -> Self {
        self.collect = true;
        self
    }

    /// Run the production. Patches go to the listener when one is set and
    /// are left empty in the result.
    pub fn run(self) -> DraftResult<Produced> {
        let recipe = self.recipe.ok_or(DraftError::InvalidRecipeArgument)?;
        if self.listener.is_some() && self.collect {
            return Err(DraftError::InvalidPatchListenerArgument);
        }
        let with_patches = self.collect || self.listener.is_some();
        let done = self
            .drafter
            .run(ScopeOwner::Produce, self.base, recipe, with_patches)?;
        let (patches, inverse_patches) = done.patches.unwrap_or_default();
        match self.listener {
            Some(listener) => {
                listener(patches, inverse_patches);
                Ok(Produced {
                    value: done.value,
                    patches: Vec::new(),
                    inverse_patches: Vec::new(),
                })
            }
            None => Ok(Produced {
                value: done.value,
                patches,
                inverse_patches,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathStep;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn producer_reuses_its_recipe() {
        let drafter = Drafter::new();
        let append = drafter.producer(|draft: Value, item: i64| draft.push(item));
        let one = append.produce(json!([]), 1).unwrap().unwrap();
        let two = append.produce(&one, 2).unwrap().unwrap();
        assert_eq!(one, json!([1]));
        assert_eq!(two, json!([1, 2]));
        assert!(one.at(0usize).unwrap().is(&two.at(0usize).unwrap()));
        assert_eq!(append.produce_default(3), Err(DraftError::UnsupportedOperation { op: "push", kind: "null" }));
    }

    #[test]
    fn production_requires_a_recipe() {
        let drafter = Drafter::new();
        let err = drafter.production().base(json!({})).run().unwrap_err();
        assert_eq!(err, DraftError::InvalidRecipeArgument);
    }

    #[test]
    fn production_rejects_listener_with_collection() {
        let drafter = Drafter::new();
        let err = drafter
            .production()
            .base(json!({}))
            .recipe(|d| d.set("a", 1))
            .listener(|_, _| {})
            .collect_patches()
            .run()
            .unwrap_err();
        assert_eq!(err, DraftError::InvalidPatchListenerArgument);
    }

    #[test]
    fn production_delivers_patches_to_listener() {
        let drafter = Drafter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let produced = drafter
            .production()
            .base(json!({"a": 1}))
            .recipe(|d| d.set("a", 2))
            .listener(move |patches, _| sink.borrow_mut().extend(patches))
            .run()
            .unwrap();
        assert_eq!(produced.value.unwrap(), json!({"a": 2}));
        assert!(produced.patches.is_empty());
        assert_eq!(
            *seen.borrow(),
            vec![Patch::replace(vec![PathStep::key("a")], Value::from(2))]
        );
    }
}
