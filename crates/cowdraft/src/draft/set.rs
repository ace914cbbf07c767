//! Unique-element container adapter.
//!
//! Members are atomic for patches, but a draftable member is still drafted
//! so that edits inside it reach the result. Such a draft stands in for its
//! member in membership checks.

use super::Draft;
use crate::error::DraftResult;
use crate::value::{Kind, Value};

impl Draft {
    fn require_set(&self, op: &'static str) -> DraftResult<()> {
        self.kind()?.require(op, &[Kind::Set])
    }

    /// The member draft standing in for `value`, if one was handed out.
    fn member_draft(&self, value: &Value) -> DraftResult<Option<Value>> {
        let children = self.with_state(|s| s.children.values().copied().collect::<Vec<_>>())?;
        for id in children {
            let child = self.sibling(id);
            if child.original()?.is(value) {
                return Ok(Some(Value::Draft(child)));
            }
        }
        Ok(None)
    }

    pub fn contains(&self, value: &Value) -> DraftResult<bool> {
        self.require_set("contains")?;
        let Some(copy) = self.copy_node()? else {
            return self.original()?.contains(value);
        };
        if copy.has_member(value) {
            return Ok(true);
        }
        Ok(self
            .member_draft(value)?
            .is_some_and(|draft| copy.has_member(&draft)))
    }

    pub fn add(&self, value: Value) -> DraftResult<bool> {
        self.require_set("add")?;
        if self.contains(&value)? {
            return Ok(false);
        }
        let copy = self.mark_changed()?;
        Ok(copy.add_member(value))
    }

    pub fn remove_value(&self, value: &Value) -> DraftResult<bool> {
        self.require_set("remove_value")?;
        if !self.contains(value)? {
            return Ok(false);
        }
        let copy = self.mark_changed()?;
        if copy.remove_member(value) {
            return Ok(true);
        }
        Ok(match self.member_draft(value)? {
            Some(draft) => copy.remove_member(&draft),
            None => false,
        })
    }

    pub(super) fn set_clear(&self) -> DraftResult<()> {
        if self.len()? == 0 {
            return Ok(());
        }
        self.mark_changed()?.clear();
        Ok(())
    }

    /// Members in order, draftable ones as drafts. Materializes the copy
    /// without marking the set modified.
    pub(super) fn set_values(&self) -> DraftResult<Vec<Value>> {
        Ok(self.stage()?.values())
    }
}
