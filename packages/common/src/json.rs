//! Defensive parsing for JSON documents of legacy or loosely-typed shape.
//!
//! Persisted schema arrays, task content, response payloads and stored
//! checkbox answers all live in JSON columns. Anything read back from one of
//! those columns goes through this module so a malformed document degrades to
//! a documented fallback value instead of failing the request.

use serde::de::DeserializeOwned;

/// Parse a JSON string, falling back to `T::default()` on malformed input.
pub fn parse_or_default<T: DeserializeOwned + Default>(raw: &str) -> T {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed JSON document, using default");
            T::default()
        }
    }
}

/// Deserialize a `serde_json::Value`, falling back to `T::default()` on shape
/// mismatch.
pub fn from_value_or_default<T: DeserializeOwned + Default>(value: &serde_json::Value) -> T {
    match serde_json::from_value(value.clone()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "JSON document has unexpected shape, using default");
            T::default()
        }
    }
}
