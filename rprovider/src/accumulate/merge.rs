//! Deep merge of partial JSON fragments into a running snapshot.
//!
//! ```rust
//! use rprovider::accumulate;
//! use serde_json::json;
//!
//! let first = accumulate(None, json!({"content": "Hel", "usage": {"tokens": 2}}))
//!     .expect("first fragment should merge");
//! let second = accumulate(Some(first), json!({"content": "lo", "usage": {"tokens": 3}}))
//!     .expect("second fragment should merge");
//!
//! assert_eq!(second, json!({"content": "Hello", "usage": {"tokens": 5}}));
//! ```

use serde_json::{Map, Number, Value};

use crate::ProviderError;

/// Keys identifying a unit rather than carrying incremental content.
const IDENTITY_KEYS: [&str; 4] = ["index", "type", "id", "role"];

/// Merges `fragment` into `snapshot`.
///
/// `null` counts as absent. Strings concatenate, numbers add, objects recurse, arrays of
/// indexed objects merge by `index` and other arrays append. Mismatched types are fatal.
pub fn accumulate(snapshot: Option<Value>, fragment: Value) -> Result<Value, ProviderError> {
    merge_value(snapshot, fragment, "$")
}

fn merge_value(current: Option<Value>, fragment: Value, path: &str) -> Result<Value, ProviderError> {
    let current = match current {
        None | Some(Value::Null) => return Ok(fragment),
        Some(current) => current,
    };

    match (current, fragment) {
        (current, Value::Null) => Ok(current),
        (Value::String(mut current), Value::String(fragment)) => {
            current.push_str(&fragment);
            Ok(Value::String(current))
        }
        (Value::Number(current), Value::Number(fragment)) => Ok(Value::Number(add_numbers(
            &current, &fragment, path,
        )?)),
        (Value::Bool(_), Value::Bool(fragment)) => Ok(Value::Bool(fragment)),
        (Value::Object(current), Value::Object(fragment)) => {
            merge_objects(current, fragment, path).map(Value::Object)
        }
        (Value::Array(current), Value::Array(fragment)) => {
            merge_arrays(current, fragment, path).map(Value::Array)
        }
        (current, fragment) => Err(ProviderError::protocol(format!(
            "cannot merge {} fragment into {} at {path}",
            type_name(&fragment),
            type_name(&current)
        ))),
    }
}

fn merge_objects(
    mut current: Map<String, Value>,
    fragment: Map<String, Value>,
    path: &str,
) -> Result<Map<String, Value>, ProviderError> {
    for (key, value) in fragment {
        if IDENTITY_KEYS.contains(&key.as_str()) && !value.is_null() {
            current.insert(key, value);
            continue;
        }

        let child_path = format!("{path}.{key}");
        let existing = current.get_mut(&key).map(std::mem::take);
        let merged = merge_value(existing, value, &child_path)?;
        current.insert(key, merged);
    }

    Ok(current)
}

fn merge_arrays(
    mut current: Vec<Value>,
    fragment: Vec<Value>,
    path: &str,
) -> Result<Vec<Value>, ProviderError> {
    for item in fragment {
        let Some(index) = item_index(&item) else {
            current.push(item);
            continue;
        };

        let position = current
            .iter()
            .position(|existing| item_index(existing) == Some(index));

        match position {
            Some(position) => {
                let existing = current.remove(position);
                let merged = merge_value(Some(existing), item, &format!("{path}[{index}]"))?;
                current.insert(position, merged);
            }
            None => {
                let insert_at = current
                    .iter()
                    .position(|existing| item_index(existing).is_some_and(|other| other > index))
                    .unwrap_or(current.len());
                current.insert(insert_at, item);
            }
        }
    }

    Ok(current)
}

fn item_index(value: &Value) -> Option<u64> {
    value.as_object()?.get("index")?.as_u64()
}

fn add_numbers(current: &Number, fragment: &Number, path: &str) -> Result<Number, ProviderError> {
    if let (Some(a), Some(b)) = (current.as_i64(), fragment.as_i64()) {
        return a
            .checked_add(b)
            .map(Number::from)
            .ok_or_else(|| ProviderError::protocol(format!("integer overflow at {path}")));
    }

    let sum = current.as_f64().unwrap_or_default() + fragment.as_f64().unwrap_or_default();
    Number::from_f64(sum)
        .ok_or_else(|| ProviderError::protocol(format!("non-finite number at {path}")))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ProviderErrorKind;

    fn fold(fragments: Vec<Value>) -> Result<Value, ProviderError> {
        fragments
            .into_iter()
            .try_fold(None, |snapshot, fragment| accumulate(snapshot, fragment).map(Some))
            .map(Option::unwrap_or_default)
    }

    #[test]
    fn first_fragment_wins_when_snapshot_is_absent() {
        let merged = accumulate(None, json!({"content": "hi"})).expect("merge should work");
        assert_eq!(merged, json!({"content": "hi"}));
    }

    #[test]
    fn null_fragments_are_treated_as_absent() {
        let merged = fold(vec![
            json!({"content": "a", "refusal": null}),
            json!({"content": null}),
            json!({"refusal": "no"}),
        ])
        .expect("merge should work");
        assert_eq!(merged, json!({"content": "a", "refusal": "no"}));
    }

    #[test]
    fn identity_keys_are_overwritten_not_concatenated() {
        let merged = fold(vec![
            json!({"role": "assistant", "type": "function", "index": 0, "content": "x"}),
            json!({"role": "assistant", "type": "function", "index": 0, "content": "y"}),
        ])
        .expect("merge should work");
        assert_eq!(
            merged,
            json!({"role": "assistant", "type": "function", "index": 0, "content": "xy"})
        );
    }

    #[test]
    fn numbers_add_as_integers_or_floats() {
        let merged = fold(vec![
            json!({"tokens": 2, "cost": 0.5}),
            json!({"tokens": 3, "cost": 0.25}),
        ])
        .expect("merge should work");
        assert_eq!(merged, json!({"tokens": 5, "cost": 0.75}));
    }

    #[test]
    fn indexed_arrays_merge_by_index_even_out_of_order() {
        let merged = fold(vec![
            json!({"tool_calls": [{"index": 1, "function": {"arguments": "{\"b\""}}]}),
            json!({"tool_calls": [{"index": 0, "function": {"arguments": "{}"}}]}),
            json!({"tool_calls": [{"index": 1, "function": {"arguments": ":1}"}}]}),
        ])
        .expect("merge should work");

        assert_eq!(
            merged,
            json!({"tool_calls": [
                {"index": 0, "function": {"arguments": "{}"}},
                {"index": 1, "function": {"arguments": "{\"b\":1}"}}
            ]})
        );
    }

    #[test]
    fn primitive_arrays_append() {
        let merged = fold(vec![json!({"stop": ["a"]}), json!({"stop": ["b", "c"]})])
            .expect("merge should work");
        assert_eq!(merged, json!({"stop": ["a", "b", "c"]}));
    }

    #[test]
    fn conflicting_types_report_path() {
        let error = fold(vec![
            json!({"message": {"content": {"text": "a"}}}),
            json!({"message": {"content": "b"}}),
        ])
        .expect_err("type conflict should fail");

        assert_eq!(error.kind, ProviderErrorKind::Protocol);
        assert!(error.message.contains("$.message.content"), "{}", error.message);
    }

    #[test]
    fn string_fragments_concatenate_to_the_full_text() {
        let pieces = ["The ", "quick ", "", "brown ", "fox"];
        let merged = fold(
            pieces
                .iter()
                .map(|piece| json!({"content": piece}))
                .collect(),
        )
        .expect("merge should work");

        assert_eq!(merged["content"], pieces.concat());
    }
}
