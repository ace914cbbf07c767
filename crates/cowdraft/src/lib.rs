//! cowdraft: copy-on-write drafts over immutable nested values.
//!
//! A recipe receives a mutable draft of a base value. Finishing the
//! production yields a new immutable value that shares every untouched
//! branch with the base, optionally with forward and inverse patches.
//!
//! ```
//! use cowdraft::{Drafter, Value};
//! use serde_json::json;
//!
//! let drafter = Drafter::new();
//! let base = Value::from(json!({"todos": [{"done": false}, {"done": false}]}));
//!
//! let produced = drafter
//!     .produce_with_patches(&base, |draft| {
//!         draft.at("todos")?.at(0usize)?.set("done", true)
//!     })
//!     .unwrap();
//!
//! let next = produced.value.unwrap();
//! assert_eq!(next, json!({"todos": [{"done": true}, {"done": false}]}));
//!
//! // The second todo was not touched and is shared.
//! let second = |v: &Value| v.at("todos").unwrap().at(1usize).unwrap();
//! assert!(second(&next).is(&second(&base)));
//!
//! // Inverse patches restore the base.
//! let undone = drafter.apply_patches(&next, &produced.inverse_patches).unwrap();
//! assert_eq!(undone, base);
//! ```

pub mod config;
pub mod draft;
pub mod drafter;
pub mod error;
mod finalize;
pub mod global;
pub mod patch;
pub mod producer;
pub mod provider;
pub mod recipe;
pub mod scope;
pub mod state;
pub mod value;

pub use cowdraft_path::{format_json_pointer, parse_json_pointer, Path, PathStep};

pub use config::{Config, Hooks, Settings};
pub use draft::Draft;
pub use drafter::{Drafter, Produced};
pub use error::{DraftError, DraftResult};
pub use global::{
    apply_patches, create_draft, current, discard_draft, drafter, finish_draft, on_assign, on_copy,
    on_delete, original, produce, produce_with_patches, set_auto_freeze, set_use_proxies,
};
pub use patch::{Patch, PatchListener, PatchOp};
pub use producer::{Producer, Production};
pub use recipe::{RecipeOutput, NOTHING};
pub use scope::{Scope, ScopeId, ScopeOwner};
pub use state::{DraftId, DraftState};
pub use value::{
    deep_clone, deep_equal, freeze, is_draft, is_draftable, is_frozen, Kind, Node, Value,
};
