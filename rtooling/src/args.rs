//! JSON argument parsing helpers for function and trait-based tools.
//!
//! ```rust
//! use rtooling::{parse_arguments, required_string};
//!
//! let args = parse_arguments(r#"{"query":"rust"}"#).expect("arguments should parse");
//! let query = required_string(&args, "query").expect("query should be present");
//! assert_eq!(query, "rust");
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ToolError;

/// Parses backend-issued arguments. Blank input is treated as an empty object.
pub fn parse_arguments(raw_arguments: &str) -> Result<Value, ToolError> {
    if raw_arguments.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_str(raw_arguments)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

pub fn deserialize_arguments<T>(args: Value) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(args)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid arguments: {err}")))
}

pub fn required_string(args: &Value, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn required_number(args: &Value, key: &str) -> Result<f64, ToolError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required number: '{key}'")))
}
