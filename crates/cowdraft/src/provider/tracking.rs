use std::rc::Rc;

use super::{check_write_index, DraftProvider};
use crate::draft::Draft;
use crate::error::DraftResult;
use crate::scope::Scope;
use crate::value::Value;
use crate::PathStep;

/// Observes every edit eagerly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingProvider;

impl TrackingProvider {
    /// Write path shared with the sweep provider for keys the base has.
    pub(super) fn tracked_write(draft: &Draft, key: PathStep, value: Value) -> DraftResult<()> {
        check_write_index(draft, &key)?;
        if !draft.is_modified()? {
            let current = draft.peek_latest(&key)?;
            if let Some(Value::Draft(child)) = &current {
                if child.belongs_to(draft.scope()) && child.original()?.is(&value) {
                    return draft.restore_child(&key, value);
                }
            }
            if current.is_some_and(|c| c.is(&value)) {
                return Ok(());
            }
        }
        let copy = draft.mark_changed()?;
        if copy.get(&key).is_some_and(|c| c.is(&value)) {
            return Ok(());
        }
        copy.put(&key, value)?;
        draft.with_state_mut(|s| s.assigned.insert(key, true))?;
        Ok(())
    }
}

impl DraftProvider for TrackingProvider {
    fn name(&self) -> &'static str {
        "tracking"
    }

    fn write(&self, draft: &Draft, key: PathStep, value: Value) -> DraftResult<()> {
        Self::tracked_write(draft, key, value)
    }

    fn delete(&self, draft: &Draft, key: PathStep) -> DraftResult<bool> {
        let existed = draft.latest_has(&key)?;
        if draft.base_has(&key)? {
            draft.mark_changed()?;
            draft.with_state_mut(|s| s.assigned.insert(key.clone(), false))?;
        } else {
            draft.with_state_mut(|s| s.assigned.shift_remove(&key))?;
        }
        if let Some(copy) = draft.copy_node()? {
            copy.take(&key);
        }
        Ok(existed)
    }

    fn set_len(&self, draft: &Draft, len: usize) -> DraftResult<()> {
        let current = draft.len()?;
        if len >= current {
            return Ok(());
        }
        let copy = draft.mark_changed()?;
        let base_len = draft.base_len()?;
        draft.with_state_mut(|s| {
            for i in len..current {
                if i < base_len {
                    s.assigned.insert(PathStep::Index(i), false);
                } else {
                    s.assigned.shift_remove(&PathStep::Index(i));
                }
            }
        })?;
        copy.truncate(len);
        Ok(())
    }

    fn will_finalize(&self, _scope: &Rc<Scope>, _result: Option<&Value>, _is_replaced: bool) -> DraftResult<()> {
        Ok(())
    }
}
