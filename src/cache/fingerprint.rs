//! Content fingerprints used as entity tags.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of a body's string form.
//! Composite JSON values are written canonically (object keys sorted) before
//! hashing so that logically equal documents share a fingerprint regardless of
//! how their maps were built.

use std::fmt;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Fingerprints raw bytes, e.g. a response body exactly as emitted.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Fingerprints a JSON value.
///
/// A string contributes its raw contents, other scalars their JSON text, and
/// arrays/objects their canonical compact serialization.
///
/// ```
/// use ledger_gateway::cache::{fingerprint_bytes, fingerprint_value};
/// use serde_json::json;
///
/// let fp = fingerprint_value(&json!({"value": 123, "name": "Test"}));
/// assert_eq!(fp, fingerprint_bytes(br#"{"name":"Test","value":123}"#));
/// assert_eq!(fingerprint_value(&json!("abc")), fingerprint_bytes(b"abc"));
/// ```
pub fn fingerprint_value(value: &Value) -> String {
    match value {
        Value::String(s) => fingerprint_bytes(s.as_bytes()),
        other => fingerprint_bytes(canonical_json(other).as_bytes()),
    }
}

/// Fingerprints any serializable value.
///
/// Never fails: a value serde_json cannot represent (say, a map with non-string
/// keys) is fingerprinted through its `Debug` form instead.
pub fn fingerprint<T>(value: &T) -> String
where
    T: Serialize + fmt::Debug + ?Sized,
{
    match serde_json::to_value(value) {
        Ok(json) => fingerprint_value(&json),
        Err(e) => {
            tracing::debug!(error = %e, "value is not JSON-serializable, fingerprinting its debug form");
            fingerprint_bytes(format!("{value:?}").as_bytes())
        }
    }
}

/// Compact JSON with object keys in byte order at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Writing into a String cannot fail.
                let _ = write!(out, "{}:", Value::String(key.clone()));
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}
