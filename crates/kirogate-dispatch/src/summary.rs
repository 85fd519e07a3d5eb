//! Bounded structural trace of a request envelope for failure logs.
//!
//! The summary keeps shape and sizes but never payload bytes, so it is safe
//! to log even for adversarial inputs.

use serde_json::{json, Map, Value};

/// Recursion stops here with a `[MaxDepth]` marker.
pub const MAX_SUMMARY_DEPTH: usize = 6;
/// Objects report at most this many keys.
pub const MAX_SUMMARY_KEYS: usize = 60;
/// Arrays sample at most this many leading elements.
pub const MAX_ARRAY_SAMPLE: usize = 3;

pub fn summarize(value: &Value) -> Value {
    summarize_at(value, 0)
}

fn summarize_at(value: &Value, depth: usize) -> Value {
    if depth >= MAX_SUMMARY_DEPTH {
        return Value::String("[MaxDepth]".to_string());
    }
    match value {
        Value::String(s) => Value::String(format!("<string len={}>", s.len())),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::Array(items) => json!({
            "_type": "array",
            "length": items.len(),
            "sample": items
                .iter()
                .take(MAX_ARRAY_SAMPLE)
                .map(|item| summarize_at(item, depth + 1))
                .collect::<Vec<_>>(),
        }),
        Value::Object(map) => {
            let mut keys = Map::new();
            for (key, v) in map.iter().take(MAX_SUMMARY_KEYS) {
                keys.insert(key.clone(), summarize_at(v, depth + 1));
            }
            json!({
                "_type": "object",
                "keys": keys,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_become_length_tags() {
        let v = summarize(&json!({"content": "secret payload"}));
        assert_eq!(v["keys"]["content"], "<string len=14>");
    }

    #[test]
    fn scalars_pass_through() {
        let v = summarize(&json!({"n": 42, "b": true, "z": null}));
        assert_eq!(v["keys"]["n"], 42);
        assert_eq!(v["keys"]["b"], true);
        assert_eq!(v["keys"]["z"], Value::Null);
    }

    #[test]
    fn arrays_sample_first_three() {
        let v = summarize(&json!([1, 2, 3, 4, 5]));
        assert_eq!(v["_type"], "array");
        assert_eq!(v["length"], 5);
        assert_eq!(v["sample"].as_array().unwrap().len(), MAX_ARRAY_SAMPLE);
    }

    #[test]
    fn objects_cap_keys() {
        let mut map = Map::new();
        for i in 0..100 {
            map.insert(format!("k{i:03}"), json!(i));
        }
        let v = summarize(&Value::Object(map));
        assert_eq!(v["_type"], "object");
        assert_eq!(
            v["keys"].as_object().unwrap().len(),
            MAX_SUMMARY_KEYS
        );
    }

    #[test]
    fn recursion_stops_at_max_depth() {
        let mut v = json!("leaf");
        for _ in 0..10 {
            v = json!({ "inner": v });
        }
        let mut cursor = &summarize(&v);
        let mut depth = 0;
        while let Some(next) = cursor.get("keys").and_then(|k| k.get("inner")) {
            cursor = next;
            depth += 1;
        }
        assert_eq!(*cursor, Value::String("[MaxDepth]".to_string()));
        assert_eq!(depth, MAX_SUMMARY_DEPTH);
    }

    #[test]
    fn no_payload_bytes_leak() {
        let v = summarize(&json!({
            "token": "sk-very-secret",
            "nested": {"body": "private text"},
            "list": ["private item"]
        }));
        let rendered = v.to_string();
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("private"));
    }
}
