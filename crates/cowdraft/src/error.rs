//! Error type shared by every draft operation.

use thiserror::Error;

use crate::PathStep;

/// Errors raised by productions, drafts and the patch engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DraftError {
    // ── Argument shape ────────────────────────────────────────────────────
    #[error("the recipe must be provided before running a production")]
    InvalidRecipeArgument,
    #[error("a patch listener cannot be combined with collected patches")]
    InvalidPatchListenerArgument,
    #[error("invalid manual draft argument: {0}")]
    InvalidManualDraftArgument(&'static str),

    // ── Lifecycle ─────────────────────────────────────────────────────────
    #[error("the draft has already been finalized")]
    DraftAlreadyFinalized,
    #[error("a recipe returned a new value and also modified its draft")]
    RecipeReturnedValueAndMutated,
    #[error("circular reference detected while finalizing")]
    CircularReferenceDetected,
    #[error("the draft was used after its scope was revoked")]
    DraftRevoked,

    // ── Access ────────────────────────────────────────────────────────────
    #[error("cannot modify a frozen value")]
    FrozenValue,
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("invalid key {key:?} for a {kind}")]
    InvalidKey { key: PathStep, kind: &'static str },
    #[error("key {0:?} not found")]
    KeyNotFound(PathStep),
    #[error("operation '{op}' is not supported on a {kind}")]
    UnsupportedOperation { op: &'static str, kind: &'static str },

    // ── Patches ───────────────────────────────────────────────────────────
    #[error("cannot apply patch, path does not resolve: {path}")]
    PatchPathUnresolvable { path: String },
    #[error("unsupported patch: {0}")]
    UnsupportedPatch(String),
    #[error("invalid patch json: {0}")]
    InvalidPatchJson(String),

    /// Failure raised by a caller's recipe.
    #[error("recipe failed: {0}")]
    Recipe(String),
}

impl DraftError {
    /// Shorthand for failing a recipe with a message.
    pub fn recipe(msg: impl Into<String>) -> Self {
        DraftError::Recipe(msg.into())
    }
}

pub type DraftResult<T> = Result<T, DraftError>;
