//! JSON codec for patches.
//!
//! A patch encodes as `{"op", "path", "value"?}` with `path` an array of
//! strings and numbers. Decoding also accepts a JSON Pointer string for
//! `path`, whose steps decode as keys.

use serde_json::{Map, Value as Json};

use crate::error::{DraftError, DraftResult};
use crate::patch::{Patch, PatchOp};
use crate::value::Value;
use crate::{parse_json_pointer, Path, PathStep};

// ── Path helpers ──────────────────────────────────────────────────────────

fn encode_path(path: &[PathStep]) -> Json {
    Json::Array(
        path.iter()
            .map(|step| match step {
                PathStep::Index(i) => Json::from(*i),
                PathStep::Key(k) => Json::String(k.clone()),
            })
            .collect(),
    )
}

fn decode_path(v: &Json) -> DraftResult<Path> {
    match v {
        Json::String(pointer) => Ok(parse_json_pointer(pointer)),
        Json::Array(steps) => steps
            .iter()
            .map(|step| match step {
                Json::String(k) => Ok(PathStep::Key(k.clone())),
                Json::Number(n) => n
                    .as_u64()
                    .map(|i| PathStep::Index(i as usize))
                    .ok_or_else(|| DraftError::InvalidPatchJson(format!("invalid path step {n}"))),
                other => Err(DraftError::InvalidPatchJson(format!("invalid path step {other}"))),
            })
            .collect(),
        _ => Err(DraftError::InvalidPatchJson("path must be an array or a pointer".into())),
    }
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize a patch to a `serde_json::Value`.
pub fn to_json(patch: &Patch) -> DraftResult<Json> {
    let mut m = Map::new();
    m.insert("op".into(), Json::String(patch.op.as_str().into()));
    m.insert("path".into(), encode_path(&patch.path));
    if let Some(value) = &patch.value {
        m.insert("value".into(), value.to_json()?);
    }
    Ok(Json::Object(m))
}

/// Serialize a list of patches to a JSON array.
pub fn to_json_patch(patches: &[Patch]) -> DraftResult<Json> {
    patches
        .iter()
        .map(to_json)
        .collect::<DraftResult<Vec<_>>>()
        .map(Json::Array)
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Deserialize a patch from a `serde_json::Value`.
pub fn from_json(v: &Json) -> DraftResult<Patch> {
    let obj = v
        .as_object()
        .ok_or_else(|| DraftError::InvalidPatchJson("patch must be an object".into()))?;
    let op = obj
        .get("op")
        .and_then(Json::as_str)
        .ok_or_else(|| DraftError::InvalidPatchJson("missing op".into()))?;
    let op = PatchOp::from_str(op).ok_or_else(|| DraftError::InvalidPatchJson(format!("unknown op {op}")))?;
    let path = decode_path(
        obj.get("path")
            .ok_or_else(|| DraftError::InvalidPatchJson("missing path".into()))?,
    )?;
    let value = obj.get("value").cloned().map(Value::from);
    if op != PatchOp::Remove && value.is_none() {
        return Err(DraftError::InvalidPatchJson(format!("{} requires a value", op.as_str())));
    }
    Ok(Patch { op, path, value })
}

/// Deserialize a JSON array of patches.
pub fn from_json_patch(v: &Json) -> DraftResult<Vec<Patch>> {
    v.as_array()
        .ok_or_else(|| DraftError::InvalidPatchJson("patches must be an array".into()))?
        .iter()
        .map(from_json)
        .collect()
}
