//! What a recipe hands back.

use crate::value::Value;

/// The outcome of a recipe.
///
/// `Unchanged` keeps whatever the recipe did to its draft. `Replace` swaps
/// the whole result for a new value. `Nothing` produces no value at all.
#[derive(Debug, Clone, Default)]
pub enum RecipeOutput {
    #[default]
    Unchanged,
    Replace(Value),
    Nothing,
}

/// Return this from a recipe to produce no value.
pub const NOTHING: RecipeOutput = RecipeOutput::Nothing;

impl RecipeOutput {
    /// The returned value, if the recipe returned one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            RecipeOutput::Replace(value) => Some(value),
            _ => None,
        }
    }
}

impl From<()> for RecipeOutput {
    fn from(_: ()) -> Self {
        RecipeOutput::Unchanged
    }
}

impl From<Value> for RecipeOutput {
    fn from(value: Value) -> Self {
        RecipeOutput::Replace(value)
    }
}

/// `None` means "no return value", not [`NOTHING`].
impl From<Option<Value>> for RecipeOutput {
    fn from(value: Option<Value>) -> Self {
        value.map_or(RecipeOutput::Unchanged, RecipeOutput::Replace)
    }
}
