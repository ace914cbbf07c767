//! Patch generation for one finalized draft.
//!
//! Runs after the draft's children are finalized, so values in the copy are
//! final. Each draft only describes its own level: child drafts with a path
//! of their own record their edits separately.

use crate::draft::{base_entries, latest_child};
use crate::error::{DraftError, DraftResult};
use crate::state::DraftState;
use crate::value::{Kind, Node, Value};
use crate::{Path, PathStep};

use super::Patch;

/// Forward and inverse patches for the edits recorded on `state`.
pub(crate) fn generate_patches(state: &DraftState, base_path: &Path) -> DraftResult<(Vec<Patch>, Vec<Patch>)> {
    let copy = state.copy.as_ref().ok_or(DraftError::DraftRevoked)?;
    match state.kind {
        Kind::Record | Kind::Map => from_assigned(state, copy, base_path),
        Kind::Sequence => sequence_patches(state, copy, base_path),
        Kind::Set => set_patches(state, copy, base_path),
    }
}

fn child_path(base: &Path, key: &PathStep) -> Path {
    let mut path = base.clone();
    path.push(key.clone());
    path
}

fn from_assigned(state: &DraftState, copy: &Node, base_path: &Path) -> DraftResult<(Vec<Patch>, Vec<Patch>)> {
    let mut patches = Vec::new();
    let mut inverse = Vec::new();
    for (key, &assigned) in &state.assigned {
        let original = latest_child(&state.base, key)?;
        let value = copy.get(key);
        let path = child_path(base_path, key);
        match (assigned, original) {
            (false, original) => {
                patches.push(Patch::remove(path.clone()));
                inverse.push(Patch::add(path, original.unwrap_or_default()));
            }
            (true, Some(original)) => {
                let value = value.unwrap_or_default();
                if original.is(&value) {
                    continue;
                }
                patches.push(Patch::replace(path.clone(), value));
                inverse.push(Patch::replace(path, original));
            }
            (true, None) => {
                patches.push(Patch::add(path.clone(), value.unwrap_or_default()));
                inverse.push(Patch::remove(path));
            }
        }
    }
    Ok((patches, inverse))
}

fn sequence_patches(state: &DraftState, copy: &Node, base_path: &Path) -> DraftResult<(Vec<Patch>, Vec<Patch>)> {
    let base: Vec<Value> = base_entries(&state.base)?.into_iter().map(|(_, v)| v).collect();
    let copy = copy.values();
    let mut patches = Vec::new();
    let mut inverse = Vec::new();
    {
        // A shrunken sequence is described as the inverse of a growth.
        let (shorter, longer, forward, backward) = if copy.len() < base.len() {
            (&copy, &base, &mut inverse, &mut patches)
        } else {
            (&base, &copy, &mut patches, &mut inverse)
        };
        for (index, (short, long)) in shorter.iter().zip(longer.iter()).enumerate() {
            let assigned = state.assigned.get(&PathStep::Index(index)) == Some(&true);
            if assigned && !long.is(short) {
                let path = child_path(base_path, &PathStep::Index(index));
                forward.push(Patch::replace(path.clone(), long.clone()));
                backward.push(Patch::replace(path, short.clone()));
            }
        }
        for (index, long) in longer.iter().enumerate().skip(shorter.len()) {
            forward.push(Patch::add(child_path(base_path, &PathStep::Index(index)), long.clone()));
        }
        for index in (shorter.len()..longer.len()).rev() {
            backward.push(Patch::remove(child_path(base_path, &PathStep::Index(index))));
        }
    }
    Ok((patches, inverse))
}

fn set_patches(state: &DraftState, copy: &Node, base_path: &Path) -> DraftResult<(Vec<Patch>, Vec<Patch>)> {
    let base: Vec<Value> = base_entries(&state.base)?.into_iter().map(|(_, v)| v).collect();
    let copy = copy.values();
    let mut patches = Vec::new();
    let mut inverse = Vec::new();
    for (index, member) in base.iter().enumerate() {
        if !copy.iter().any(|m| m.is(member)) {
            let path = child_path(base_path, &PathStep::Index(index));
            patches.push(Patch::remove_member(path.clone(), member.clone()));
            inverse.insert(0, Patch::add(path, member.clone()));
        }
    }
    for (index, member) in copy.iter().enumerate() {
        if !base.iter().any(|m| m.is(member)) {
            let path = child_path(base_path, &PathStep::Index(index));
            patches.push(Patch::add(path.clone(), member.clone()));
            inverse.insert(0, Patch::remove_member(path, member.clone()));
        }
    }
    Ok((patches, inverse))
}
