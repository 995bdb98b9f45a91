//! Staged endpoint patching
//!
//! Shape validation and merging of IS-05 PATCH `/staged` requests. The
//! validator accepts any merge that conforms to the endpoint schema;
//! semantic validation beyond the schema (e.g. against receiver
//! capabilities) is deliberately not performed.

use serde_json::Value;

use rnmos_node_core::{ResourceKind, Version};

use crate::error::{Error, Result};

pub const MODE_ACTIVATE_IMMEDIATE: &str = "activate_immediate";
pub const MODE_ACTIVATE_SCHEDULED_ABSOLUTE: &str = "activate_scheduled_absolute";
pub const MODE_ACTIVATE_SCHEDULED_RELATIVE: &str = "activate_scheduled_relative";

/// The activation a merged staged endpoint asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationRequest {
    /// No activation field in the patch; leave any pending one alone.
    None,
    /// `mode: null`; cancel a pending scheduled activation.
    Clear,
    Immediate,
    /// Absolute TAI activation time.
    ScheduledAbsolute(Version),
    /// Offset from the time the request is processed.
    ScheduledRelative(Version),
}

fn expect_bool(value: &Value, key: &str) -> Result<()> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(Error::Validation(format!("{} must be a boolean", key)))
    }
}

fn expect_string_or_null(value: &Value, key: &str) -> Result<()> {
    if value.is_string() || value.is_null() {
        Ok(())
    } else {
        Err(Error::Validation(format!("{} must be a string or null", key)))
    }
}

fn expect_port_or_auto(value: &Value, key: &str) -> Result<()> {
    match value {
        Value::Number(n) if n.as_u64().map_or(false, |p| p <= u64::from(u16::MAX)) => Ok(()),
        Value::String(s) if s == "auto" => Ok(()),
        _ => Err(Error::Validation(format!(
            "{} must be a port number or \"auto\"",
            key
        ))),
    }
}

fn expect_ip_or_auto(value: &Value, key: &str) -> Result<()> {
    match value {
        Value::String(_) => Ok(()),
        _ => Err(Error::Validation(format!(
            "{} must be an address or \"auto\"",
            key
        ))),
    }
}

fn validate_leg(kind: ResourceKind, leg: &Value) -> Result<()> {
    let leg = leg
        .as_object()
        .ok_or_else(|| Error::Validation("transport_params entries must be objects".to_string()))?;
    for (key, value) in leg {
        match (kind, key.as_str()) {
            (ResourceKind::Sender, "source_ip") => expect_ip_or_auto(value, key)?,
            (ResourceKind::Sender, "destination_ip") => expect_ip_or_auto(value, key)?,
            (ResourceKind::Sender, "source_port") => expect_port_or_auto(value, key)?,
            (ResourceKind::Receiver, "interface_ip") => expect_ip_or_auto(value, key)?,
            (ResourceKind::Receiver, "multicast_ip") => expect_string_or_null(value, key)?,
            (ResourceKind::Receiver, "source_ip") => expect_string_or_null(value, key)?,
            (_, "destination_port") => expect_port_or_auto(value, key)?,
            (_, "rtp_enabled") => expect_bool(value, key)?,
            _ => {
                return Err(Error::Validation(format!(
                    "unexpected transport parameter: {}",
                    key
                )))
            }
        }
    }
    Ok(())
}

fn validate_activation(activation: &Value) -> Result<()> {
    let activation = activation
        .as_object()
        .ok_or_else(|| Error::Validation("activation must be an object".to_string()))?;
    for (key, value) in activation {
        match key.as_str() {
            "mode" => match value {
                Value::Null => {}
                Value::String(mode)
                    if mode == MODE_ACTIVATE_IMMEDIATE
                        || mode == MODE_ACTIVATE_SCHEDULED_ABSOLUTE
                        || mode == MODE_ACTIVATE_SCHEDULED_RELATIVE => {}
                _ => {
                    return Err(Error::Validation(format!(
                        "unknown activation mode: {}",
                        value
                    )))
                }
            },
            "requested_time" => expect_string_or_null(value, key)?,
            _ => {
                return Err(Error::Validation(format!(
                    "unexpected activation field: {}",
                    key
                )))
            }
        }
    }
    Ok(())
}

/// Validate the shape of a PATCH `/staged` body against the endpoint
/// schema for the given resource kind and leg count.
pub fn validate_patch(kind: ResourceKind, legs: usize, patch: &Value) -> Result<()> {
    let patch = patch
        .as_object()
        .ok_or_else(|| Error::Validation("patch must be an object".to_string()))?;
    for (key, value) in patch {
        match (kind, key.as_str()) {
            (_, "master_enable") => expect_bool(value, key)?,
            (_, "activation") => validate_activation(value)?,
            (_, "transport_params") => {
                let params = value.as_array().ok_or_else(|| {
                    Error::Validation("transport_params must be an array".to_string())
                })?;
                if params.len() > legs {
                    return Err(Error::Validation(format!(
                        "transport_params has {} legs but the resource has {}",
                        params.len(),
                        legs
                    )));
                }
                for leg in params {
                    validate_leg(kind, leg)?;
                }
            }
            (ResourceKind::Sender, "receiver_id") => expect_string_or_null(value, key)?,
            (ResourceKind::Receiver, "sender_id") => expect_string_or_null(value, key)?,
            (ResourceKind::Receiver, "transport_file") => {
                let file = value.as_object().ok_or_else(|| {
                    Error::Validation("transport_file must be an object".to_string())
                })?;
                for (file_key, file_value) in file {
                    match file_key.as_str() {
                        "data" | "type" => expect_string_or_null(file_value, file_key)?,
                        _ => {
                            return Err(Error::Validation(format!(
                                "unexpected transport_file field: {}",
                                file_key
                            )))
                        }
                    }
                }
            }
            _ => return Err(Error::Validation(format!("unexpected field: {}", key))),
        }
    }
    Ok(())
}

/// Merge a validated patch into the staged endpoint. `auto` values stay
/// literal; they resolve at activation.
pub fn merge_patch(staged: &mut Value, patch: &Value) {
    let Some(patch) = patch.as_object() else {
        return;
    };
    for (key, value) in patch {
        match key.as_str() {
            "transport_params" => {
                if let (Some(staged_legs), Some(patch_legs)) = (
                    staged["transport_params"].as_array_mut(),
                    value.as_array(),
                ) {
                    for (staged_leg, patch_leg) in staged_legs.iter_mut().zip(patch_legs) {
                        if let (Some(staged_leg), Some(patch_leg)) =
                            (staged_leg.as_object_mut(), patch_leg.as_object())
                        {
                            for (leg_key, leg_value) in patch_leg {
                                staged_leg.insert(leg_key.clone(), leg_value.clone());
                            }
                        }
                    }
                }
            }
            "activation" | "transport_file" => {
                if let (Some(staged_field), Some(patch_field)) =
                    (staged[key].as_object_mut(), value.as_object())
                {
                    for (field_key, field_value) in patch_field {
                        staged_field.insert(field_key.clone(), field_value.clone());
                    }
                }
            }
            _ => {
                staged[key] = value.clone();
            }
        }
    }
}

/// Interpret the activation the merged staged endpoint requests.
pub fn activation_request(patch: &Value, staged: &Value) -> Result<ActivationRequest> {
    if patch.get("activation").is_none() {
        return Ok(ActivationRequest::None);
    }
    let mode = &staged["activation"]["mode"];
    let requested_time = staged["activation"]["requested_time"].as_str();
    match mode.as_str() {
        None => Ok(ActivationRequest::Clear),
        Some(MODE_ACTIVATE_IMMEDIATE) => Ok(ActivationRequest::Immediate),
        Some(MODE_ACTIVATE_SCHEDULED_ABSOLUTE) => {
            let time: Version = requested_time
                .ok_or_else(|| {
                    Error::Validation("scheduled activation requires requested_time".to_string())
                })?
                .parse()
                .map_err(|_| Error::Validation("invalid requested_time".to_string()))?;
            Ok(ActivationRequest::ScheduledAbsolute(time))
        }
        Some(MODE_ACTIVATE_SCHEDULED_RELATIVE) => {
            let offset: Version = requested_time
                .ok_or_else(|| {
                    Error::Validation("scheduled activation requires requested_time".to_string())
                })?
                .parse()
                .map_err(|_| Error::Validation("invalid requested_time".to_string()))?;
            Ok(ActivationRequest::ScheduledRelative(offset))
        }
        Some(other) => Err(Error::Validation(format!(
            "unknown activation mode: {}",
            other
        ))),
    }
}
