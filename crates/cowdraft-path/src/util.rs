//! JSON Pointer escaping, parsing and formatting plus path predicates.

use crate::types::{Path, PathStep};
use crate::PathError;

/// Unescapes a JSON Pointer path component.
///
/// Per RFC 6901, `~1` is replaced with `/` and `~0` is replaced with `~`.
///
/// # Example
///
/// ```
/// use cowdraft_path::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// assert_eq!(unescape_component("no-escapes"), "no-escapes");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // ~1 first, otherwise "~01" would decode to "/"
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a JSON Pointer path component.
///
/// # Example
///
/// ```
/// use cowdraft_path::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parse a JSON Pointer string into a path of key steps.
///
/// The empty pointer is the root. Every component becomes a
/// [`PathStep::Key`]; numeric components still resolve against sequences
/// through [`PathStep::as_index`].
///
/// # Example
///
/// ```
/// use cowdraft_path::{parse_json_pointer, PathStep};
///
/// assert!(parse_json_pointer("").is_empty());
/// assert_eq!(parse_json_pointer("/a~1b/0"), vec![PathStep::key("a/b"), PathStep::key("0")]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Vec::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/')
        .map(|c| PathStep::Key(unescape_component(c)))
        .collect()
}

/// Format a path as a JSON Pointer string. The root path formats as `""`.
///
/// # Example
///
/// ```
/// use cowdraft_path::{format_json_pointer, PathStep};
///
/// assert_eq!(format_json_pointer(&[]), "");
/// assert_eq!(format_json_pointer(&[PathStep::key("items"), PathStep::index(3)]), "/items/3");
/// ```
pub fn format_json_pointer(path: &[PathStep]) -> String {
    let mut out = String::with_capacity(path.len() * 8);
    for step in path {
        out.push('/');
        match step {
            PathStep::Index(i) => out.push_str(&i.to_string()),
            PathStep::Key(k) => out.push_str(&escape_component(k)),
        }
    }
    out
}

/// Check if a path points to the root value.
pub fn is_root(path: &[PathStep]) -> bool {
    path.is_empty()
}

/// Check if `parent` is a strict prefix of `child`.
///
/// Steps compare by their key rendering, so `Index(1)` and `Key("1")` are the
/// same step.
///
/// ```
/// use cowdraft_path::{is_child, PathStep};
///
/// let parent = vec![PathStep::key("list")];
/// let child = vec![PathStep::key("list"), PathStep::index(0)];
/// assert!(is_child(&parent, &child));
/// assert!(!is_child(&child, &parent));
/// ```
pub fn is_child(parent: &[PathStep], child: &[PathStep]) -> bool {
    if parent.len() >= child.len() {
        return false;
    }
    parent
        .iter()
        .zip(child.iter())
        .all(|(a, b)| a.to_key() == b.to_key())
}

/// Get the parent path of a given path.
///
/// # Errors
///
/// Returns [`PathError::NoParent`] for the root path.
pub fn parent(path: &[PathStep]) -> Result<Path, PathError> {
    match path.split_last() {
        Some((_, init)) => Ok(init.to_vec()),
        None => Err(PathError::NoParent),
    }
}

/// Check if a string represents a canonical non-negative integer index.
///
/// ```
/// use cowdraft_path::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("123"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// assert!(!is_valid_index("abc"));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}
