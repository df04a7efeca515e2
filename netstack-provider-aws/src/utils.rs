//! Helpers converting between stack values and Cloud Control JSON

use std::collections::HashMap;

use netstack_core::resource::Value;
use serde_json::json;

/// Build a CloudFormation tag list from a `tags` map
pub fn build_tags(user_tags: Option<&Value>) -> Vec<serde_json::Value> {
    let mut tags = Vec::new();
    if let Some(Value::Map(user_tags)) = user_tags {
        let mut keys: Vec<_> = user_tags.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(Value::String(v)) = user_tags.get(key) {
                tags.push(json!({"Key": key, "Value": v}));
            }
        }
    }
    tags
}

/// Parse a CloudFormation tag list into a map
pub fn parse_tags(tags_array: &[serde_json::Value]) -> HashMap<String, Value> {
    let mut tags_map = HashMap::new();
    for tag in tags_array {
        if let (Some(key), Some(value)) = (
            tag.get("Key").and_then(|v| v.as_str()),
            tag.get("Value").and_then(|v| v.as_str()),
        ) {
            tags_map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    tags_map
}

/// JSON patch operation setting `property` to `value`
pub fn set_property(property: &str, value: serde_json::Value) -> serde_json::Value {
    // "add" replaces an existing member and also covers unset properties
    json!({"op": "add", "path": format!("/{}", property), "value": value})
}

/// JSON patch operation removing `property`
pub fn remove_property(property: &str) -> serde_json::Value {
    json!({"op": "remove", "path": format!("/{}", property)})
}
