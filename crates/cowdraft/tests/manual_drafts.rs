mod common;

use common::{init_tracing, v};
use cowdraft::{is_frozen, DraftError, Drafter, Patch, PathStep, Value};
use serde_json::json;
use std::rc::Rc;

#[test]
fn finishing_an_untouched_draft_returns_the_base() {
    init_tracing();
    let drafter = Drafter::new();
    let base = v(json!({"a": {"b": 1}}));
    let draft = drafter.create_draft(&base).unwrap();
    assert_eq!(draft.at("a").unwrap().at("b").unwrap(), Value::from(1));
    let done = drafter.finish_draft(&draft).unwrap().unwrap();
    assert!(done.is(&base));
}

#[test]
fn manual_drafts_outlive_their_creation_call() {
    let drafter = Drafter::new();
    let first = drafter.create_draft(json!({"n": 1})).unwrap();
    let second = drafter.create_draft(json!([1])).unwrap();
    assert!(drafter.current_scope().is_none());

    second.push(2).unwrap();
    first.set("n", 2).unwrap();

    let produced = drafter.finish_draft_with_patches(&first).unwrap();
    assert_eq!(produced.value.clone().unwrap(), json!({"n": 2}));
    assert_eq!(
        produced.patches,
        vec![Patch::replace(vec![PathStep::key("n")], Value::from(2))]
    );
    let list = drafter.finish_draft(&second).unwrap().unwrap();
    assert_eq!(list, json!([1, 2]));
    assert!(is_frozen(&list));
}

#[test]
fn finish_draft_with_listener_delivers_patches() {
    let drafter = Drafter::new();
    let draft = drafter.create_draft(json!({"a": 1})).unwrap();
    draft.delete("a").unwrap();
    let mut seen = None;
    let done = drafter
        .finish_draft_with_listener(&draft, |patches, inverse| seen = Some((patches, inverse)))
        .unwrap()
        .unwrap();
    assert_eq!(done, json!({}));
    let (patches, inverse) = seen.unwrap();
    assert_eq!(patches, vec![Patch::remove(vec![PathStep::key("a")])]);
    assert_eq!(inverse, vec![Patch::add(vec![PathStep::key("a")], Value::from(1))]);
}

#[test]
fn finishing_twice_is_rejected() {
    let drafter = Drafter::new();
    let draft = drafter.create_draft(json!({})).unwrap();
    drafter.finish_draft(&draft).unwrap();
    assert_eq!(drafter.finish_draft(&draft), Err(DraftError::DraftAlreadyFinalized));
    assert_eq!(draft.set("a", 1), Err(DraftError::DraftRevoked));
}

#[test]
fn only_manual_root_drafts_can_be_finished() {
    let drafter = Drafter::new();
    assert!(matches!(
        drafter.create_draft("text"),
        Err(DraftError::InvalidManualDraftArgument(_))
    ));
    assert!(matches!(
        drafter.finish_draft(&v(json!({}))),
        Err(DraftError::InvalidManualDraftArgument(_))
    ));

    let draft = drafter.create_draft(json!({"child": {}})).unwrap();
    let child = draft.at("child").unwrap();
    assert!(matches!(
        drafter.finish_draft(&child),
        Err(DraftError::InvalidManualDraftArgument(_))
    ));

    drafter
        .produce(json!({}), |inner| {
            assert!(matches!(
                drafter.finish_draft(&inner),
                Err(DraftError::InvalidManualDraftArgument(_))
            ));
            Ok(())
        })
        .unwrap();
}

#[test]
fn drafting_a_draft_snapshots_it() {
    let drafter = Drafter::new();
    let next = drafter
        .produce(json!({"list": [1]}), |draft| {
            draft.at("list")?.push(2)?;
            let copy = drafter.create_draft(&draft)?;
            copy.at("list")?.push(3)?;
            let detached = drafter.finish_draft(&copy)?.unwrap();
            assert_eq!(detached, json!({"list": [1, 2, 3]}));
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert_eq!(next, json!({"list": [1, 2]}));
}

#[test]
fn discarding_a_draft_releases_its_arena() {
    let drafter = Drafter::new();
    let draft = drafter.create_draft(json!({"a": {"b": 1}})).unwrap();
    let child = draft.at("a").unwrap();
    // the copy now holds `child`, which points back at the scope
    draft.set("x", 1).unwrap();
    let scope = Rc::downgrade(draft.as_draft().unwrap().scope());

    drafter.discard_draft(&draft).unwrap();
    assert_eq!(child.get("b"), Err(DraftError::DraftRevoked));
    assert_eq!(drafter.finish_draft(&draft), Err(DraftError::DraftAlreadyFinalized));
    assert_eq!(drafter.discard_draft(&draft), Err(DraftError::DraftAlreadyFinalized));

    drop((draft, child));
    assert!(scope.upgrade().is_none());
}

#[test]
fn only_manual_root_drafts_can_be_discarded() {
    let drafter = Drafter::new();
    let draft = drafter.create_draft(json!({"a": {}})).unwrap();
    let child = draft.at("a").unwrap();
    assert!(matches!(
        drafter.discard_draft(&child),
        Err(DraftError::InvalidManualDraftArgument(_))
    ));
    assert!(matches!(
        drafter.discard_draft(&v(json!({}))),
        Err(DraftError::InvalidManualDraftArgument(_))
    ));
    assert_eq!(drafter.finish_draft(&draft).unwrap().unwrap(), json!({"a": {}}));
}
