//! Shape checks applied to every config layer before merging.
//!
//! Layers are partial, so every key is optional; only unknown keys and
//! wrongly typed values are rejected.

use crate::ConfigError;
use serde_json::Value;

/// Expected shape of one config value.
enum Shape {
    Object(&'static [(&'static str, Shape)]),
    Text,
    Flag,
    Count,
    Number,
    TextList,
    OneOf(&'static [&'static str]),
}

const ROOT: Shape = Shape::Object(&[
    ("$schema", Shape::Text),
    (
        "replay",
        Shape::Object(&[
            ("matcher", Shape::OneOf(&["auto", "text", "vector"])),
            ("threshold", Shape::Number),
            ("text_threshold", Shape::Number),
            ("vector_threshold", Shape::Number),
        ]),
    ),
    (
        "embedding",
        Shape::Object(&[
            ("model", Shape::Text),
            ("base_url", Shape::Text),
            ("api_key_env", Shape::TextList),
            ("api_key_header", Shape::Text),
            ("max_batch_size", Shape::Count),
            ("timeout_secs", Shape::Count),
        ]),
    ),
    (
        "cache",
        Shape::Object(&[("enabled", Shape::Flag), ("suffix", Shape::Text)]),
    ),
]);

/// Check one layer document; errors carry `layer:json.path`.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    check(value, &ROOT, layer, "")
}

fn check(value: &Value, shape: &Shape, layer: &str, path: &str) -> Result<(), ConfigError> {
    let fail = |message: String| {
        let at = if path.is_empty() { "root" } else { path };
        Err(ConfigError::InvalidField {
            path: format!("{layer}:{at}"),
            message,
        })
    };
    match shape {
        Shape::Object(fields) => {
            let Value::Object(map) = value else {
                return fail("expected object".to_string());
            };
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match fields.iter().find(|(name, _)| name == key) {
                    Some((_, shape)) => check(child, shape, layer, &child_path)?,
                    None => {
                        return Err(ConfigError::InvalidField {
                            path: format!("{layer}:{child_path}"),
                            message: "unknown key".to_string(),
                        });
                    }
                }
            }
            Ok(())
        }
        Shape::Text if value.is_string() => Ok(()),
        Shape::Text => fail("expected string".to_string()),
        Shape::Flag if value.is_boolean() => Ok(()),
        Shape::Flag => fail("expected bool".to_string()),
        Shape::Count if value.is_u64() => Ok(()),
        Shape::Count => fail("expected non-negative integer".to_string()),
        Shape::Number if value.is_number() => Ok(()),
        Shape::Number => fail("expected number".to_string()),
        Shape::TextList => {
            let Value::Array(items) = value else {
                return fail("expected array of strings".to_string());
            };
            match items.iter().position(|item| !item.is_string()) {
                Some(index) => fail(format!("expected string at index {index}")),
                None => Ok(()),
            }
        }
        Shape::OneOf(options) => match value.as_str() {
            Some(choice) if options.contains(&choice) => Ok(()),
            _ => fail(format!("expected one of: {}", options.join(", "))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::validate_layer_schema;
    use serde_json::json;

    fn message(value: serde_json::Value) -> String {
        validate_layer_schema(&value, "test")
            .expect_err("schema error")
            .to_string()
    }

    #[test]
    fn partial_layers_pass() {
        assert!(validate_layer_schema(&json!({}), "test").is_ok());
        assert!(
            validate_layer_schema(
                &json!({ "embedding": { "api_key_env": ["A"], "timeout_secs": 5 } }),
                "test"
            )
            .is_ok()
        );
    }

    #[test]
    fn errors_name_the_json_path() {
        assert!(message(json!({ "replay": { "nope": 1 } })).contains("test:replay.nope"));
        assert!(message(json!({ "embedding": { "api_key_env": ["A", 3] } }))
            .contains("index 1"));
        assert!(message(json!({ "embedding": { "max_batch_size": -1 } }))
            .contains("non-negative"));
        assert!(message(json!([])).contains("test:root"));
    }
}
