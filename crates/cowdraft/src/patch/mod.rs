//! Structural patches.
//!
//! A finalization with patches enabled records, for every modified draft
//! reachable through untouched keys, the `add`/`replace`/`remove` operations
//! that turn the base into the result, plus their inverses in undo order.
//!
//! Sequences are diffed positionally, records and maps from the keys the
//! draft saw written or removed, and unique-element containers by member
//! identity.

pub mod apply;
pub mod codec;
mod generate;
pub mod types;

pub use apply::apply_to;
pub use codec::json::{from_json, from_json_patch, to_json, to_json_patch};
pub(crate) use generate::generate_patches;
pub use types::{Patch, PatchOp};

/// Receives forward and inverse patches once a production finishes.
pub type PatchListener = Box<dyn FnOnce(Vec<Patch>, Vec<Patch>)>;
