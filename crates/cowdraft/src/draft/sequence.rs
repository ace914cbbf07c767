//! Structural sequence edits, composed from element reads, element writes
//! and truncation so that every move is observed by the active provider.

use super::Draft;
use crate::error::{DraftError, DraftResult};
use crate::value::{Kind, Value};
use crate::PathStep;

impl Draft {
    fn sequence_len(&self, op: &'static str) -> DraftResult<usize> {
        self.kind()?.require(op, &[Kind::Sequence])?;
        self.len()
    }

    fn element(&self, index: usize) -> DraftResult<Value> {
        let len = self.len()?;
        self.read(&PathStep::Index(index))?
            .ok_or(DraftError::IndexOutOfBounds { index, len })
    }

    pub fn push(&self, value: Value) -> DraftResult<()> {
        let len = self.sequence_len("push")?;
        self.scope.provider().write(self, PathStep::Index(len), value)
    }

    pub fn pop(&self) -> DraftResult<Option<Value>> {
        let len = self.sequence_len("pop")?;
        if len == 0 {
            return Ok(None);
        }
        let last = self.element(len - 1)?;
        self.scope.provider().set_len(self, len - 1)?;
        Ok(Some(last))
    }

    pub fn insert(&self, index: usize, value: Value) -> DraftResult<()> {
        let len = self.sequence_len("insert")?;
        if index > len {
            return Err(DraftError::IndexOutOfBounds { index, len });
        }
        let provider = self.scope.provider();
        for j in (index..len).rev() {
            let moved = self.element(j)?;
            provider.write(self, PathStep::Index(j + 1), moved)?;
        }
        provider.write(self, PathStep::Index(index), value)
    }

    pub fn remove(&self, index: usize) -> DraftResult<Value> {
        let len = self.sequence_len("remove")?;
        if index >= len {
            return Err(DraftError::IndexOutOfBounds { index, len });
        }
        let provider = self.scope.provider();
        let removed = self.element(index)?;
        for j in index + 1..len {
            let moved = self.element(j)?;
            provider.write(self, PathStep::Index(j - 1), moved)?;
        }
        provider.set_len(self, len - 1)?;
        Ok(removed)
    }

    pub fn truncate(&self, len: usize) -> DraftResult<()> {
        self.sequence_len("truncate")?;
        self.scope.provider().set_len(self, len)
    }
}
