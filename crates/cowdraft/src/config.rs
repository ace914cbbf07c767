//! Production settings: serializable flags plus registered hooks.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::state::DraftState;
use crate::value::Value;
use crate::PathStep;

/// Serializable production flags.
///
/// Missing fields take their defaults, so a partial TOML or JSON document is
/// a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Freeze finalized results so they reject further mutation.
    pub auto_freeze: bool,
    /// Select the tracking draft provider; `false` selects the sweep provider.
    pub use_proxies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_freeze: true,
            use_proxies: true,
        }
    }
}

/// Called for every finalized child of a modified record, sequence or map.
pub type AssignHook = Rc<dyn Fn(&DraftState, &PathStep, &Value)>;
/// Called for every key removed from a modified draft.
pub type DeleteHook = Rc<dyn Fn(&DraftState, &PathStep)>;
/// Called once per modified draft after its children are finalized.
pub type CopyHook = Rc<dyn Fn(&DraftState)>;

#[derive(Clone, Default)]
pub struct Hooks {
    pub on_assign: Option<AssignHook>,
    pub on_delete: Option<DeleteHook>,
    pub on_copy: Option<CopyHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_assign", &self.on_assign.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_copy", &self.on_copy.is_some())
            .finish()
    }
}

/// Everything a scope snapshots when it opens.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config: Config,
    pub hooks: Hooks,
}

impl Settings {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hooks: Hooks::default(),
        }
    }
}
