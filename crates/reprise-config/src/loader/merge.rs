//! JSON merge helpers for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base, recursively overriding objects.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_scalars_replace() {
        let mut base = json!({ "replay": { "text_threshold": 0.7, "matcher": "auto" } });
        merge_json_values(
            &mut base,
            &json!({ "replay": { "matcher": "text" }, "cache": { "enabled": false } }),
        );
        assert_eq!(
            base,
            json!({
                "replay": { "text_threshold": 0.7, "matcher": "text" },
                "cache": { "enabled": false }
            })
        );
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let mut base = json!({ "embedding": { "api_key_env": ["A", "B"] } });
        merge_json_values(&mut base, &json!({ "embedding": { "api_key_env": ["C"] } }));
        assert_eq!(base, json!({ "embedding": { "api_key_env": ["C"] } }));
    }
}
