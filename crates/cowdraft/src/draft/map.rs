//! Associative container adapter. Map edits are always tracked eagerly,
//! whichever provider is active.

use super::Draft;
use crate::error::DraftResult;
use crate::PathStep;
use crate::value::Value;

impl Draft {
    pub(super) fn map_set(&self, key: PathStep, value: Value) -> DraftResult<()> {
        let unchanged = self.latest_has(&key)?
            && self.peek_latest(&key)?.is_some_and(|current| current.is(&value));
        if unchanged {
            return Ok(());
        }
        let copy = self.mark_changed()?;
        copy.put(&key, value)?;
        self.with_state_mut(|s| s.assigned.insert(key, true))?;
        Ok(())
    }

    pub(super) fn map_delete(&self, key: &PathStep) -> DraftResult<bool> {
        if !self.latest_has(key)? {
            return Ok(false);
        }
        let copy = self.mark_changed()?;
        let in_base = self.base_has(key)?;
        self.with_state_mut(|s| {
            if in_base {
                s.assigned.insert(key.clone(), false);
            } else {
                s.assigned.shift_remove(key);
            }
        })?;
        copy.take(key);
        Ok(true)
    }

    pub(super) fn map_clear(&self) -> DraftResult<()> {
        if self.len()? == 0 {
            return Ok(());
        }
        let copy = self.mark_changed()?;
        let base_keys = self.original()?.keys()?;
        self.with_state_mut(|s| {
            s.assigned = base_keys.into_iter().map(|k| (k, false)).collect();
        })?;
        copy.clear();
        Ok(())
    }
}
