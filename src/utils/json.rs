// Start of file: /src/utils/json.rs

use serde::Serialize;
use serde_json::Value;
use anyhow::Result;

// Convert any `Serialize` type into a two-space-indented JSON string.
pub fn to_two_space_indented_json<T: Serialize>(value: &T) -> Result<String> {
    let json_value: serde_json::Value = serde_json::to_value(value)?;
    let pretty_json: String = serde_json::to_string_pretty(&json_value)?;
    Ok(pretty_json)
}

// Shallow merge: keys of `overlay` replace keys of `base`.
// A non-object overlay leaves `base` unchanged.
pub fn merge_objects(base: Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(changes)) => {
            for (key, value) in changes {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (base, _) => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overlay_keys_win() {
        let merged: Value = merge_objects(
            json!({ "id": 1, "city": "Paris", "language": "French" }),
            &json!({ "city": "Lyon" }),
        );

        assert_eq!(merged, json!({ "id": 1, "city": "Lyon", "language": "French" }));
    }

    #[test]
    fn null_overlay_values_are_kept() {
        let merged: Value = merge_objects(json!({ "city": "Paris" }), &json!({ "city": null }));
        assert_eq!(merged, json!({ "city": null }));
    }

    #[test]
    fn non_object_overlay_is_ignored() {
        let base: Value = json!({ "id": 7 });
        assert_eq!(merge_objects(base.clone(), &json!([1])), base);
    }

    #[test]
    fn indents_with_two_spaces() {
        let text: String = to_two_space_indented_json(&json!({ "a": 1 })).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }
}

// End of file: /src/utils/json.rs
