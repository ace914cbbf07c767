mod common;

use common::{init_tracing, v};
use cowdraft::{DraftError, Drafter, PathStep, Value, NOTHING};
use futures::executor::block_on;
use futures::FutureExt;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn deferred_recipe_finalizes_after_resolving() {
    init_tracing();
    let drafter = Drafter::new();
    let base = v(json!({"user": {"name": "ada"}, "tags": []}));
    let watcher = drafter.clone();
    let next = block_on(drafter.produce_async(&base, |draft| async move {
        assert!(watcher.current_scope().is_none());
        futures::future::ready(()).await;
        draft.at("user")?.set("name", "grace")?;
        Ok::<_, DraftError>(())
    }))
    .unwrap()
    .unwrap();
    assert_eq!(next, json!({"user": {"name": "grace"}, "tags": []}));
    assert!(next.at("tags").unwrap().is(&base.at("tags").unwrap()));
}

#[test]
fn deferred_recipe_failure_revokes_the_scope() {
    let drafter = Drafter::new();
    let escaped = Rc::new(RefCell::new(None));
    let slot = escaped.clone();
    let err = block_on(drafter.produce_async(json!({"a": 1}), |draft| async move {
        *slot.borrow_mut() = Some(draft.clone());
        draft.set("a", 2)?;
        Err::<(), _>(DraftError::recipe("remote call failed"))
    }))
    .unwrap_err();
    assert_eq!(err, DraftError::recipe("remote call failed"));
    let draft = escaped.borrow_mut().take().unwrap();
    assert_eq!(draft.get("a"), Err(DraftError::DraftRevoked));
}

#[test]
fn deferred_recipe_can_replace_or_return_nothing() {
    let drafter = Drafter::new();
    let replaced = block_on(drafter.produce_async(json!({"a": 1}), |_| async {
        Ok::<_, DraftError>(Value::from(json!([1])))
    }))
    .unwrap();
    assert_eq!(replaced.unwrap(), json!([1]));

    let nothing = block_on(drafter.produce_async(json!({"a": 1}), |_| async {
        Ok::<_, DraftError>(NOTHING)
    }))
    .unwrap();
    assert!(nothing.is_none());
}

#[test]
fn deferred_recipe_collects_patches() {
    let drafter = Drafter::new();
    let produced = block_on(drafter.produce_async_with_patches(json!({"n": [0]}), |draft| async move {
        draft.at("n")?.push(1)?;
        Ok::<_, DraftError>(())
    }))
    .unwrap();
    assert_eq!(produced.patches.len(), 1);
    assert_eq!(produced.patches[0].path, vec![PathStep::key("n"), PathStep::index(1)]);
}

#[test]
fn interleaved_productions_do_not_share_scopes() {
    let drafter = Drafter::new();
    let first = drafter.produce_async(json!({"a": 1}), |draft| async move {
        draft.set("a", 10)?;
        Ok::<_, DraftError>(())
    });
    let plain = drafter
        .produce(json!({"b": 1}), |draft| draft.set("b", 2))
        .unwrap()
        .unwrap();
    assert_eq!(plain, json!({"b": 2}));
    let first = block_on(first).unwrap().unwrap();
    assert_eq!(first, json!({"a": 10}));
}

#[test]
fn dropping_a_suspended_production_revokes_its_scope() {
    let drafter = Drafter::new();
    let escaped = Rc::new(RefCell::new(None));
    let slot = escaped.clone();
    let suspended = drafter.produce_async(json!({"a": {"b": 1}}), |draft| async move {
        let a = draft.at("a")?;
        draft.set("c", 2)?;
        *slot.borrow_mut() = Some(a);
        futures::future::pending::<()>().await;
        Ok::<_, DraftError>(())
    });
    assert!(suspended.now_or_never().is_none());

    let a = escaped.borrow_mut().take().unwrap();
    let scope = a.as_draft().unwrap().scope().clone();
    assert!(scope.is_revoked());
    assert_eq!(a.get("b"), Err(DraftError::DraftRevoked));
    assert!(drafter.current_scope().is_none());

    let weak = Rc::downgrade(&scope);
    drop((a, scope));
    assert!(weak.upgrade().is_none());
}
