//! IS-05 `auto` parameter resolution
//!
//! When a sender or receiver is activated, any transport parameter left as
//! the literal `"auto"` must resolve to a concrete value. The node pins
//! `source_ip`/`interface_ip` to the single value enumerated in the
//! endpoint constraints, derives sender destinations from the repeatable
//! source-specific multicast scheme, and then falls back to the IS-05
//! specification defaults.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::id::source_specific_multicast_v4;
use crate::resources::ResourceKind;

/// The IS-05 default RTP port.
const DEFAULT_RTP_PORT: u16 = 5004;

fn resolve_field<F>(leg: &mut Value, field: &str, resolver: F)
where
    F: FnOnce() -> Value,
{
    if leg[field] == json!("auto") {
        leg[field] = resolver();
    }
}

fn constraint_enum_front(constraints: &Value, leg: usize, field: &str) -> Result<Value> {
    constraints[leg][field]["enum"]
        .as_array()
        .and_then(|values| values.first())
        .cloned()
        .ok_or_else(|| {
            Error::Internal(format!(
                "endpoint constraints do not enumerate {} for leg {}",
                field, leg
            ))
        })
}

/// Resolve every `auto` value in an RTP sender's or receiver's transport
/// parameters.
///
/// The constraints must be the ones placed on the connection resource at
/// creation, which enumerate the interface address of each leg.
pub fn resolve_rtp_auto(
    kind: ResourceKind,
    id: &Uuid,
    constraints: &Value,
    transport_params: &mut Value,
) -> Result<()> {
    let legs = transport_params
        .as_array()
        .map(Vec::len)
        .unwrap_or_default();
    for leg in 0..legs {
        let resolved_ip = match kind {
            ResourceKind::Sender => {
                let source_ip = constraint_enum_front(constraints, leg, "source_ip")?;
                let leg_params = &mut transport_params[leg];
                resolve_field(leg_params, "source_ip", || source_ip);
                resolve_field(leg_params, "destination_ip", || {
                    json!(source_specific_multicast_v4(id, leg).to_string())
                });
                resolve_field(leg_params, "source_port", || json!(DEFAULT_RTP_PORT));
                resolve_field(leg_params, "destination_port", || json!(DEFAULT_RTP_PORT));
                continue;
            }
            ResourceKind::Receiver => constraint_enum_front(constraints, leg, "interface_ip")?,
            other => {
                return Err(Error::Internal(format!(
                    "cannot resolve transport params for a {}",
                    other
                )))
            }
        };
        let leg_params = &mut transport_params[leg];
        resolve_field(leg_params, "interface_ip", || resolved_ip);
        resolve_field(leg_params, "destination_port", || json!(DEFAULT_RTP_PORT));
    }
    Ok(())
}
