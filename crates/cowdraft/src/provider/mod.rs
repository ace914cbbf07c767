//! Draft providers: how record and sequence edits are observed.
//!
//! Two interchangeable variants exist. [`TrackingProvider`] observes every
//! write, delete and truncation as it happens, so `assigned` is exact.
//! [`SweepProvider`] only observes overwrites of keys the base already has;
//! other edits are staged into the copy unobserved and discovered by a sweep
//! over the scope right before finalization.
//!
//! Maps and sets bypass the provider: their adapters always track eagerly.

mod sweep;
mod tracking;

use std::rc::Rc;

pub use sweep::SweepProvider;
pub use tracking::TrackingProvider;

use crate::draft::Draft;
use crate::error::{DraftError, DraftResult};
use crate::scope::Scope;
use crate::value::{Kind, Value};
use crate::PathStep;

pub trait DraftProvider {
    fn name(&self) -> &'static str;

    /// Write `value` at canonical `key` of a record or sequence draft.
    fn write(&self, draft: &Draft, key: PathStep, value: Value) -> DraftResult<()>;

    /// Remove canonical `key` from a record draft. Returns whether the key
    /// was present.
    fn delete(&self, draft: &Draft, key: PathStep) -> DraftResult<bool>;

    /// Shrink a sequence draft to `len` elements. Never grows.
    fn set_len(&self, draft: &Draft, len: usize) -> DraftResult<()>;

    /// Called once before the scope is finalized. `result` is the value the
    /// recipe returned, if any.
    fn will_finalize(&self, scope: &Rc<Scope>, result: Option<&Value>, is_replaced: bool) -> DraftResult<()>;
}

static TRACKING: TrackingProvider = TrackingProvider;
static SWEEP: SweepProvider = SweepProvider;

/// The provider selected by the `use_proxies` flag.
pub(crate) fn select(use_proxies: bool) -> &'static dyn DraftProvider {
    if use_proxies {
        &TRACKING
    } else {
        &SWEEP
    }
}

/// Reject writes that would leave a gap in a sequence.
fn check_write_index(draft: &Draft, key: &PathStep) -> DraftResult<()> {
    if draft.kind()? != Kind::Sequence {
        return Ok(());
    }
    let len = draft.len()?;
    match key.as_index() {
        Some(index) if index <= len => Ok(()),
        Some(index) => Err(DraftError::IndexOutOfBounds { index, len }),
        None => Err(DraftError::InvalidKey {
            key: key.clone(),
            kind: Kind::Sequence.name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_selects_provider() {
        assert_eq!(select(true).name(), "tracking");
        assert_eq!(select(false).name(), "sweep");
    }
}
