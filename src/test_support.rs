//! Shared fixtures for unit tests.

use crate::store::Record;
use serde_json::Value;

/// JSON object literal as a request body.
pub fn body(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("test body must be a JSON object, got {other}"),
    }
}
