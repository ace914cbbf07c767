//! Paths for structural patches.
//!
//! A patch path is an ordered list of [`PathStep`]s from the root of a value.
//! Steps are string keys or numeric positions. Paths can be rendered as and
//! parsed from [JSON Pointer (RFC 6901)](https://tools.ietf.org/html/rfc6901)
//! strings.
//!
//! # Example
//!
//! ```
//! use cowdraft_path::{format_json_pointer, parse_json_pointer, PathStep};
//!
//! let path = vec![PathStep::key("todos"), PathStep::index(0), PathStep::key("done")];
//! let pointer = format_json_pointer(&path);
//! assert_eq!(pointer, "/todos/0/done");
//!
//! let parsed = parse_json_pointer(&pointer);
//! assert_eq!(parsed[1].as_index(), Some(0));
//! ```

use thiserror::Error;

pub mod types;
pub mod util;
pub mod validate;

pub use types::{Path, PathStep};
pub use util::{
    escape_component, format_json_pointer, is_child, is_root, is_valid_index, parent,
    parse_json_pointer, unescape_component,
};
pub use validate::{validate_json_pointer, validate_path, ValidationError};

/// Errors from path helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("NO_PARENT")]
    NoParent,
}
