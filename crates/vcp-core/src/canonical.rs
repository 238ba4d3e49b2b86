//! Canonical serialization and SHA-256 helpers.
//!
//! Canonical form is compact JSON with object keys sorted bytewise at every
//! depth, no insignificant whitespace, and integers only.  Key order is
//! enforced here rather than trusted to `serde_json::Map`, whose ordering
//! changes if any crate in the build enables `preserve_order`.
//!
//! Floating-point numbers are refused: every decimal quantity in the data
//! model is a string, so a float reaching this point is a bug.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use vcp_contracts::error::{VcpError, VcpResult};

/// Serialize `value` into its canonical byte form.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> VcpResult<Vec<u8>> {
    let tree = serde_json::to_value(value).map_err(|e| VcpError::InternalFault {
        reason: format!("value cannot be represented as JSON: {e}"),
    })?;
    let mut out = Vec::with_capacity(256);
    write_value(&tree, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut Vec<u8>) -> VcpResult<()> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => {
            if !(n.is_u64() || n.is_i64()) {
                return Err(VcpError::InternalFault {
                    reason: format!("non-integer number {n} in canonical input"),
                });
            }
            out.extend_from_slice(n.to_string().as_bytes());
        }
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out)?;
                out.push(b':');
                write_value(item, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut Vec<u8>) -> VcpResult<()> {
    serde_json::to_writer(&mut *out, s).map_err(|e| VcpError::InternalFault {
        reason: format!("failed to encode string: {e}"),
    })
}

/// SHA-256 of `bytes`.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// SHA-256 of the canonical form of `value`, as raw bytes.
pub fn canonical_sha256<T: Serialize + ?Sized>(value: &T) -> VcpResult<[u8; 32]> {
    Ok(sha256(&to_canonical_bytes(value)?))
}

/// Decode a 64-character hex digest.
pub fn decode_hash(hex_str: &str) -> VcpResult<[u8; 32]> {
    let bytes = hex::decode(hex_str).map_err(|e| VcpError::InvalidInput {
        reason: format!("'{hex_str}' is not a hex digest: {e}"),
    })?;
    bytes.try_into().map_err(|b: Vec<u8>| VcpError::InvalidInput {
        reason: format!("digest must be 32 bytes, got {}", b.len()),
    })
}
