//! JSON rendering of arbitrary-precision naturals.
//!
//! JavaScript clients lose precision above 2^53 - 1, so naturals up to that
//! bound are emitted as JSON numbers and anything larger as a decimal string.

use candid::Nat;
use serde_json::Value;

/// Largest integer a JSON consumer can represent exactly (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

pub fn natural(n: &Nat) -> Value {
    match u64::try_from(&n.0) {
        Ok(v) if v <= MAX_SAFE_INTEGER => Value::from(v),
        _ => Value::String(n.0.to_string()),
    }
}
