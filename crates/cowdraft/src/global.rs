//! A per-thread default [`Drafter`] and free functions over it.
//!
//! Values and drafts are `Rc`-based, so the default instance is one per
//! thread; settings changed here affect later productions on the same
//! thread only.

use std::future::Future;

use crate::config::Config;
use crate::drafter::{Drafter, Produced};
use crate::error::DraftResult;
use crate::patch::Patch;
use crate::producer::Producer;
use crate::recipe::RecipeOutput;
use crate::state::DraftState;
use crate::value::Value;
use crate::PathStep;

thread_local! {
    static DEFAULT: Drafter = Drafter::new();
}

/// A handle to this thread's default instance.
pub fn drafter() -> Drafter {
    DEFAULT.with(Drafter::clone)
}

pub fn produce<F, R>(base: impl Into<Value>, recipe: F) -> DraftResult<Option<Value>>
where
    F: FnOnce(Value) -> DraftResult<R>,
    R: Into<RecipeOutput>,
{
    drafter().produce(base, recipe)
}

pub fn produce_with_patches<F, R>(base: impl Into<Value>, recipe: F) -> DraftResult<Produced>
where
    F: FnOnce(Value) -> DraftResult<R>,
    R: Into<RecipeOutput>,
{
    drafter().produce_with_patches(base, recipe)
}

pub async fn produce_async<F, Fut, R>(base: impl Into<Value>, recipe: F) -> DraftResult<Option<Value>>
where
    F: FnOnce(Value) -> Fut,
    Fut: Future<Output = DraftResult<R>>,
    R: Into<RecipeOutput>,
{
    drafter().produce_async(base, recipe).await
}

pub fn producer<A, F, R>(recipe: F) -> Producer<A, F>
where
    F: Fn(Value, A) -> DraftResult<R>,
    R: Into<RecipeOutput>,
{
    drafter().producer(recipe)
}

pub fn create_draft(base: impl Into<Value>) -> DraftResult<Value> {
    drafter().create_draft(base)
}

pub fn finish_draft(draft: &Value) -> DraftResult<Option<Value>> {
    drafter().finish_draft(draft)
}

pub fn finish_draft_with_patches(draft: &Value) -> DraftResult<Produced> {
    drafter().finish_draft_with_patches(draft)
}

pub fn discard_draft(draft: &Value) -> DraftResult<()> {
    drafter().discard_draft(draft)
}

pub fn apply_patches(base: impl Into<Value>, patches: &[Patch]) -> DraftResult<Value> {
    drafter().apply_patches(base, patches)
}

pub fn config() -> Config {
    drafter().config()
}

pub fn set_auto_freeze(enabled: bool) {
    drafter().set_auto_freeze(enabled);
}

pub fn set_use_proxies(enabled: bool) {
    drafter().set_use_proxies(enabled);
}

pub fn on_assign(hook: impl Fn(&DraftState, &PathStep, &Value) + 'static) {
    drafter().on_assign(hook);
}

pub fn on_delete(hook: impl Fn(&DraftState, &PathStep) + 'static) {
    drafter().on_delete(hook);
}

pub fn on_copy(hook: impl Fn(&DraftState) + 'static) {
    drafter().on_copy(hook);
}

/// The value a draft shadows, or `None` for anything that is not a draft.
pub fn original(value: &Value) -> DraftResult<Option<Value>> {
    match value {
        Value::Draft(draft) => draft.original().map(Some),
        _ => Ok(None),
    }
}

/// An unfrozen snapshot of a draft. Anything else is returned as is.
pub fn current(value: &Value) -> DraftResult<Value> {
    match value {
        Value::Draft(draft) => draft.current(),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn free_functions_share_one_instance() {
        let base = Value::from(json!({"list": [1]}));
        let next = produce(&base, |draft| {
            let list = draft.at("list")?;
            list.push(2)?;
            assert_eq!(original(&list)?.unwrap(), json!([1]));
            assert_eq!(current(&draft)?, json!({"list": [1, 2]}));
            Ok(())
        })
        .unwrap()
        .unwrap();
        assert_eq!(next, json!({"list": [1, 2]}));
        assert_eq!(original(&next).unwrap(), None);
        assert!(drafter().current_scope().is_none());
    }
}
