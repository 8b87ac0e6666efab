//! Lookup-key normalization.

use serde_json::Value;

/// Canonical key for a coffee name: lowercase, spaces become underscores.
///
/// `"Flat White"`, `"flat_white"` and `"FLAT WHITE"` all map to `"flat_white"`.
pub fn normalize_name(raw: &str) -> String {
    raw.to_lowercase().replace(' ', "_")
}

/// Canonical key for categories and size labels: lowercase only.
pub fn normalize_key(raw: &str) -> String {
    raw.to_lowercase()
}

/// Whether a stored scalar counts as "no value".
///
/// Null, `false`, zero, the empty string and empty containers are all falsy.
/// A legitimate zero volume is therefore reported as missing.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
