//! Deterministic JSON canonicalization (spec §4.1).
//!
//! Object keys are sorted lexicographically at every depth; array order is
//! preserved; numbers and strings keep `serde_json`'s own formatting, since
//! that formatting *is* "the source encoder" here. Re-encoding a
//! canonicalized value must be a fixed point: `canonicalize(parse(canonicalize(x)))
//! == canonicalize(x)`.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Recursively sorts object keys. Arrays keep insertion order but their
/// elements are canonicalized too, since a receipt-shaped value can in
/// principle nest objects inside arrays (the teacher's own `sortKeys`
/// equivalent only sorted one level of array items; doing it recursively
/// here is what makes the fixed-point invariant hold for arbitrary depth).
fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map.into_iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, sort_value(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}

/// Encode `value` as canonical JSON bytes.
pub fn canonicalize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let raw = serde_json::to_value(value)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize value: {e}")))?;
    let sorted = sort_value(raw);
    serde_json::to_vec(&sorted)
        .map_err(|e| Error::InvalidInput(format!("failed to encode canonical json: {e}")))
}

/// Convenience wrapper returning the canonical bytes as a UTF-8 string.
pub fn canonicalize_to_string<T: Serialize>(value: &T) -> Result<String> {
    let bytes = canonicalize(value)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidInput(format!("canonical json was not valid utf-8: {e}")))
}
