mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{both_providers, v};
use cowdraft::{Kind, PathStep};
use serde_json::json;

type Log = Rc<RefCell<Vec<String>>>;

fn record_hooks(drafter: &cowdraft::Drafter) -> Log {
    let log: Log = Rc::default();
    let sink = log.clone();
    drafter.on_assign(move |state, key, value| {
        sink.borrow_mut()
            .push(format!("assign {} {} = {}", state.kind(), key.to_key(), value.to_json().unwrap()));
    });
    let sink = log.clone();
    drafter.on_delete(move |state, key| {
        sink.borrow_mut().push(format!("delete {} {}", state.kind(), key.to_key()));
    });
    let sink = log.clone();
    drafter.on_copy(move |state| {
        sink.borrow_mut().push(format!("copy {}", state.kind()));
    });
    log
}

#[test]
fn hooks_fire_children_first() {
    for drafter in both_providers() {
        let log = record_hooks(&drafter);
        drafter
            .produce(json!({"nested": {"x": 1}, "other": {"y": 1}}), |draft| {
                draft.at("nested")?.set("x", 2)
            })
            .unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                "assign record x = 2".to_string(),
                "copy record".to_string(),
                r#"assign record nested = {"x":2}"#.to_string(),
                "copy record".to_string(),
            ]
        );
    }
}

#[test]
fn delete_hook_reports_removed_base_keys() {
    for drafter in both_providers() {
        let log = record_hooks(&drafter);
        drafter
            .produce(json!({"a": 1, "b": 2}), |draft| {
                draft.delete("a")?;
                draft.set("c", 3)?;
                draft.delete("c")?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["delete record a".to_string(), "copy record".to_string()]
        );
    }
}

#[test]
fn unmodified_productions_fire_nothing() {
    for drafter in both_providers() {
        let log = record_hooks(&drafter);
        drafter
            .produce(json!({"a": {"b": 1}}), |draft| draft.at("a").map(|_| ()))
            .unwrap();
        assert!(log.borrow().is_empty());
    }
}

#[test]
fn hook_state_describes_the_finalized_draft() {
    let [drafter, _] = both_providers();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    drafter.on_copy(move |state| {
        sink.borrow_mut().push((
            state.kind(),
            state.is_modified(),
            state.base().to_json().unwrap(),
            state.assigned().keys().cloned().collect::<Vec<_>>(),
        ));
    });
    drafter
        .produce(v(json!({"list": [1, 2]})), |draft| draft.at("list")?.set(1usize, 5))
        .unwrap();
    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, Kind::Sequence);
    assert!(seen[0].1);
    assert_eq!(seen[0].2, json!([1, 2]));
    assert_eq!(seen[0].3, vec![PathStep::Index(1)]);
    assert_eq!(seen[1].0, Kind::Record);
}

#[test]
fn clearing_hooks_stops_callbacks() {
    let [drafter, _] = both_providers();
    let log = record_hooks(&drafter);
    drafter.clear_hooks();
    drafter
        .produce(json!({"a": 1}), |draft| draft.set("a", 2))
        .unwrap();
    assert!(log.borrow().is_empty());
}
