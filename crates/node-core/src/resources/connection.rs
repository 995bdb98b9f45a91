//! IS-05 connection resource constructors
//!
//! Each sender and receiver has a connection twin holding its endpoint
//! constraints, staged and active endpoints, and (senders) the cached
//! transport file. Transport parameter tuples move between the typed SDP
//! view and the schema-shaped JSON here.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use rnmos_sdp_core::{ReceiverTransportParams, SenderTransportParams, SourcePort};

use crate::error::{Error, Result};
use crate::version::Version;

/// An activation object with no pending activation.
pub fn make_activation() -> Value {
    json!({
        "mode": null,
        "requested_time": null,
        "activation_time": null,
    })
}

fn make_endpoint(peer_key: &str, transport_params: Vec<Value>) -> Value {
    json!({
        (peer_key): null,
        "master_enable": false,
        "activation": make_activation(),
        "transport_params": transport_params,
    })
}

fn sender_leg_defaults() -> Value {
    json!({
        "source_ip": "auto",
        "destination_ip": "auto",
        "source_port": "auto",
        "destination_port": "auto",
        "rtp_enabled": true,
    })
}

fn receiver_leg_defaults() -> Value {
    json!({
        "interface_ip": "auto",
        "multicast_ip": null,
        "source_ip": null,
        "destination_port": "auto",
        "rtp_enabled": true,
    })
}

fn unconstrained_sender_leg() -> Value {
    json!({
        "source_ip": {},
        "destination_ip": {},
        "source_port": {},
        "destination_port": {},
        "rtp_enabled": {},
    })
}

fn unconstrained_receiver_leg() -> Value {
    json!({
        "interface_ip": {},
        "multicast_ip": {},
        "source_ip": {},
        "destination_port": {},
        "rtp_enabled": {},
    })
}

fn make_connection_resource(
    id: &Uuid,
    peer_key: &str,
    constraints: Vec<Value>,
    legs: Vec<Value>,
) -> Map<String, Value> {
    let mut resource = Map::new();
    resource.insert("id".to_string(), json!(id.to_string()));
    resource.insert("version".to_string(), json!(Version::now().to_string()));
    resource.insert("endpoint_constraints".to_string(), Value::Array(constraints));
    resource.insert(
        "endpoint_staged".to_string(),
        make_endpoint(peer_key, legs.clone()),
    );
    resource.insert("endpoint_active".to_string(), make_endpoint(peer_key, legs));
    resource
}

/// A connection sender with unresolved (`auto`) transport parameters and
/// an empty transport file.
pub fn make_connection_rtp_sender(id: &Uuid, legs: usize) -> Value {
    let mut resource = make_connection_resource(
        id,
        "receiver_id",
        (0..legs).map(|_| unconstrained_sender_leg()).collect(),
        (0..legs).map(|_| sender_leg_defaults()).collect(),
    );
    resource.insert(
        "endpoint_transportfile".to_string(),
        json!({ "data": null, "type": null }),
    );
    Value::Object(resource)
}

/// A connection receiver with unresolved (`auto`) transport parameters.
pub fn make_connection_rtp_receiver(id: &Uuid, legs: usize) -> Value {
    Value::Object(make_connection_resource(
        id,
        "sender_id",
        (0..legs).map(|_| unconstrained_receiver_leg()).collect(),
        (0..legs).map(|_| receiver_leg_defaults()).collect(),
    ))
}

fn port_json(port: SourcePort) -> Value {
    match port {
        SourcePort::Auto => json!("auto"),
        SourcePort::Port(port) => json!(port),
    }
}

fn optional_ip(ip: &Option<String>) -> Value {
    match ip {
        Some(ip) => json!(ip),
        None => Value::Null,
    }
}

/// Sender transport parameters as IS-05 JSON, one object per leg.
pub fn sender_params_to_json(legs: &[SenderTransportParams]) -> Value {
    Value::Array(
        legs.iter()
            .map(|leg| {
                json!({
                    "source_ip": match &leg.source_ip {
                        Some(ip) => json!(ip),
                        None => json!("auto"),
                    },
                    "destination_ip": leg.destination_ip,
                    "source_port": port_json(leg.source_port),
                    "destination_port": leg.destination_port,
                    "rtp_enabled": leg.rtp_enabled,
                })
            })
            .collect(),
    )
}

/// Receiver transport parameters as IS-05 JSON, one object per leg.
pub fn receiver_params_to_json(legs: &[ReceiverTransportParams]) -> Value {
    Value::Array(
        legs.iter()
            .map(|leg| {
                json!({
                    "interface_ip": match &leg.interface_ip {
                        Some(ip) => json!(ip),
                        None => json!("auto"),
                    },
                    "multicast_ip": optional_ip(&leg.multicast_ip),
                    "source_ip": optional_ip(&leg.source_ip),
                    "destination_port": leg.destination_port,
                    "rtp_enabled": leg.rtp_enabled,
                })
            })
            .collect(),
    )
}

fn leg_str(leg: &Value, field: &str) -> Option<String> {
    leg[field].as_str().map(str::to_string)
}

fn leg_port(leg: &Value, field: &str) -> Result<u16> {
    leg[field]
        .as_u64()
        .and_then(|port| u16::try_from(port).ok())
        .ok_or_else(|| Error::Internal(format!("transport param {} is not a port", field)))
}

/// Sender transport parameters back from IS-05 JSON; `"auto"` strings map
/// to unresolved values.
pub fn sender_params_from_json(params: &Value) -> Result<Vec<SenderTransportParams>> {
    params
        .as_array()
        .ok_or_else(|| Error::Internal("transport_params is not an array".to_string()))?
        .iter()
        .map(|leg| {
            Ok(SenderTransportParams {
                source_ip: leg_str(leg, "source_ip").filter(|ip| ip != "auto"),
                destination_ip: leg_str(leg, "destination_ip")
                    .filter(|ip| ip != "auto")
                    .ok_or_else(|| {
                        Error::Internal("sender leg has unresolved destination_ip".to_string())
                    })?,
                destination_port: leg_port(leg, "destination_port")?,
                source_port: match &leg["source_port"] {
                    Value::Number(port) => SourcePort::Port(
                        u16::try_from(port.as_u64().unwrap_or(0)).map_err(|_| {
                            Error::Internal("sender leg source_port out of range".to_string())
                        })?,
                    ),
                    _ => SourcePort::Auto,
                },
                rtp_enabled: leg["rtp_enabled"].as_bool().unwrap_or(true),
            })
        })
        .collect()
}

/// Receiver transport parameters back from IS-05 JSON.
pub fn receiver_params_from_json(params: &Value) -> Result<Vec<ReceiverTransportParams>> {
    params
        .as_array()
        .ok_or_else(|| Error::Internal("transport_params is not an array".to_string()))?
        .iter()
        .map(|leg| {
            Ok(ReceiverTransportParams {
                interface_ip: leg_str(leg, "interface_ip").filter(|ip| ip != "auto"),
                multicast_ip: leg_str(leg, "multicast_ip"),
                source_ip: leg_str(leg, "source_ip"),
                destination_port: leg_port(leg, "destination_port")?,
                rtp_enabled: leg["rtp_enabled"].as_bool().unwrap_or(true),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_connection_rtp_sender_shape() {
        let sender = make_connection_rtp_sender(&Uuid::new_v4(), 2);
        assert_eq!(sender["endpoint_constraints"].as_array().unwrap().len(), 2);
        let staged = &sender["endpoint_staged"];
        assert_eq!(staged["master_enable"], false);
        assert_eq!(staged["transport_params"][0]["source_ip"], "auto");
        assert_eq!(staged["receiver_id"], Value::Null);
        assert_eq!(sender["endpoint_transportfile"]["data"], Value::Null);
    }

    #[test]
    fn test_make_connection_rtp_receiver_shape() {
        let receiver = make_connection_rtp_receiver(&Uuid::new_v4(), 1);
        let active = &receiver["endpoint_active"];
        assert_eq!(active["sender_id"], Value::Null);
        assert_eq!(active["transport_params"][0]["interface_ip"], "auto");
        assert_eq!(active["transport_params"][0]["multicast_ip"], Value::Null);
    }

    #[test]
    fn test_sender_params_json_round_trip() {
        let legs = vec![SenderTransportParams {
            source_ip: Some("192.0.2.10".to_string()),
            destination_ip: "233.252.0.0".to_string(),
            destination_port: 5020,
            source_port: SourcePort::Port(5004),
            rtp_enabled: true,
        }];
        let json = sender_params_to_json(&legs);
        assert_eq!(json[0]["destination_port"], 5020);
        assert_eq!(sender_params_from_json(&json).unwrap(), legs);
    }

    #[test]
    fn test_sender_params_auto_source_port() {
        let legs = vec![SenderTransportParams {
            source_ip: None,
            destination_ip: "233.252.0.0".to_string(),
            destination_port: 5020,
            source_port: SourcePort::Auto,
            rtp_enabled: false,
        }];
        let json = sender_params_to_json(&legs);
        assert_eq!(json[0]["source_ip"], "auto");
        assert_eq!(json[0]["source_port"], "auto");
        let round_tripped = sender_params_from_json(&json).unwrap();
        assert_eq!(round_tripped[0].source_port, SourcePort::Auto);
        assert_eq!(round_tripped[0].source_ip, None);
    }

    #[test]
    fn test_receiver_params_json_round_trip() {
        let legs = vec![ReceiverTransportParams {
            interface_ip: Some("192.0.2.10".to_string()),
            multicast_ip: Some("233.252.0.1".to_string()),
            source_ip: None,
            destination_port: 5030,
            rtp_enabled: true,
        }];
        let json = receiver_params_to_json(&legs);
        assert_eq!(json[0]["multicast_ip"], "233.252.0.1");
        assert_eq!(json[0]["source_ip"], Value::Null);
        assert_eq!(receiver_params_from_json(&json).unwrap(), legs);
    }
}
