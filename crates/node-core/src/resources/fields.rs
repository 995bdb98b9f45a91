//! Typed accessors over resource bodies
//!
//! Small helpers for the fields the business rules read and write; the
//! bodies themselves stay schema-shaped JSON.

use serde_json::{json, Value};

use crate::version::Version;

pub fn id(data: &Value) -> Option<&str> {
    data["id"].as_str()
}

pub fn device_id(data: &Value) -> Option<&str> {
    data["device_id"].as_str()
}

pub fn node_id(data: &Value) -> Option<&str> {
    data["node_id"].as_str()
}

/// A sender's flow reference; null for a sender without a flow.
pub fn flow_id(data: &Value) -> Option<&str> {
    data["flow_id"].as_str()
}

pub fn source_id(data: &Value) -> Option<&str> {
    data["source_id"].as_str()
}

pub fn clock_name(data: &Value) -> Option<&str> {
    data["clock_name"].as_str()
}

pub fn label(data: &Value) -> Option<&str> {
    data["label"].as_str()
}

pub fn description(data: &Value) -> Option<&str> {
    data["description"].as_str()
}

pub fn transport(data: &Value) -> Option<&str> {
    data["transport"].as_str()
}

pub fn interface_bindings(data: &Value) -> Vec<&str> {
    data["interface_bindings"]
        .as_array()
        .map(|bindings| bindings.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// The device's deprecated `senders[]` or `receivers[]` array.
pub fn child_refs(data: &Value, key: &str) -> Vec<String> {
    data[key]
        .as_array()
        .map(|refs| {
            refs.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn clocks(data: &Value) -> Option<&Vec<Value>> {
    data["clocks"].as_array()
}

pub fn interfaces(data: &Value) -> Option<&Vec<Value>> {
    data["interfaces"].as_array()
}

/// Update an IS-04 sender's or receiver's `subscription` object.
pub fn set_subscription(data: &mut Value, active: bool, peer_key: &str, time: Version) {
    data["subscription"] = json!({
        (peer_key): Value::Null,
        "active": active,
    });
    data["version"] = Value::String(time.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_accessors() {
        let data = json!({
            "id": "x",
            "device_id": "d",
            "flow_id": null,
            "interface_bindings": ["192.0.2.10"],
            "senders": ["a", "b"],
        });
        assert_eq!(id(&data), Some("x"));
        assert_eq!(device_id(&data), Some("d"));
        assert_eq!(flow_id(&data), None);
        assert_eq!(interface_bindings(&data), vec!["192.0.2.10"]);
        assert_eq!(child_refs(&data, "senders"), vec!["a", "b"]);
        assert!(child_refs(&data, "receivers").is_empty());
    }
}
