//! JSON reader and writer for [`IrModule`].
//!
//! Upstream stages are not consistent about field casing, so the reader first
//! rewrites every object key that matches a known IR field case-insensitively
//! to its canonical camelCase spelling and drops explicit `null`s, letting
//! absent optional fields fall back to their defaults. Unknown fields are
//! ignored. The writer emits camelCase, pretty-printed, with null fields
//! omitted.

use serde_json::{Map, Value};

use super::IrModule;
use crate::core::error::{LegalizeError, Result};

/// Canonical spelling of every field in the IR wire format.
const CANONICAL_KEYS: &[&str] = &[
    "formatVersion",
    "profile",
    "entryPoint",
    "function",
    "stage",
    "functions",
    "name",
    "returnType",
    "parameters",
    "blocks",
    "id",
    "instructions",
    "op",
    "operands",
    "result",
    "type",
    "terminator",
    "tag",
    "values",
    "kind",
    "semantic",
    "resources",
    "writable",
    "diagnostics",
    "severity",
    "message",
];

/// Parse IR JSON text into a module.
pub fn parse_module(text: &str) -> Result<IrModule> {
    if text.trim().is_empty() {
        return Err(LegalizeError::EmptyInput);
    }

    let raw: Value = serde_json::from_str(text)?;
    let normalized = normalize_keys(raw);
    log::trace!("normalized IR JSON keys");
    Ok(serde_json::from_value(normalized)?)
}

/// Serialize a module as pretty-printed JSON.
pub fn to_json_pretty(module: &IrModule) -> Result<String> {
    Ok(serde_json::to_string_pretty(module)?)
}

fn canonical_key(key: &str) -> Option<&'static str> {
    CANONICAL_KEYS
        .iter()
        .copied()
        .find(|canonical| canonical.eq_ignore_ascii_case(key))
}

fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                if val.is_null() {
                    continue;
                }
                let key = match canonical_key(&key) {
                    Some(canonical) => canonical.to_string(),
                    None => key,
                };
                out.insert(key, normalize_keys(val));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}
