//! Type definitions for patch paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a path: a string key (records, associative containers) or a
/// numeric position (sequences, unique-element containers).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    Index(usize),
    Key(String),
}

impl PathStep {
    /// Create a key step.
    pub fn key(k: impl Into<String>) -> Self {
        PathStep::Key(k.into())
    }

    /// Create an index step.
    pub fn index(i: usize) -> Self {
        PathStep::Index(i)
    }

    /// Interpret the step as a position.
    ///
    /// Key steps qualify when they are canonical decimal integers, so a path
    /// parsed from a JSON Pointer (where every step is a string) still
    /// addresses sequence elements.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathStep::Index(i) => Some(*i),
            PathStep::Key(k) if crate::util::is_valid_index(k) => k.parse().ok(),
            PathStep::Key(_) => None,
        }
    }

    /// Interpret the step as a string key. Index steps render in decimal.
    pub fn to_key(&self) -> String {
        match self {
            PathStep::Index(i) => i.to_string(),
            PathStep::Key(k) => k.clone(),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PathStep::Index(_))
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Index(i) => write!(f, "{i}"),
            PathStep::Key(k) => f.write_str(k),
        }
    }
}

impl From<&str> for PathStep {
    fn from(s: &str) -> Self {
        PathStep::Key(s.to_owned())
    }
}

impl From<String> for PathStep {
    fn from(s: String) -> Self {
        PathStep::Key(s)
    }
}

impl From<&String> for PathStep {
    fn from(s: &String) -> Self {
        PathStep::Key(s.clone())
    }
}

impl From<usize> for PathStep {
    fn from(i: usize) -> Self {
        PathStep::Index(i)
    }
}

impl From<&PathStep> for PathStep {
    fn from(step: &PathStep) -> Self {
        step.clone()
    }
}

/// An ordered sequence of steps from the root of a value.
pub type Path = Vec<PathStep>;
