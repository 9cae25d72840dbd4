//! Canonical JSON encoding and argument hashing.
//!
//! Confirmation tokens and audit hashes must not depend on the order in
//! which a caller happened to insert object keys. The canonical form sorts
//! object keys recursively, keeps array order, and emits compact JSON.

use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Encode `value` as compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// SHA-256 (lowercase hex) of the canonical encoding of `arguments`.
pub fn args_hash(arguments: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(arguments).as_bytes());
    hex::encode(hasher.finalize())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Null => out.push_str("null"),
    }
}

fn write_string(s: &str, out: &mut String) {
    // Value::String serialization cannot fail.
    out.push_str(&Value::String(s.to_string()).to_string());
}
