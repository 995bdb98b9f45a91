//! Resource constructors
//!
//! Builders for the IS-04 resource bodies. Version stamps are placed by
//! the store at insertion; the builders fill the schema-shaped body.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use rnmos_sdp_core::types::Rational;

use crate::interfaces::HostInterface;
use crate::settings::Settings;
use crate::version::Version;

/// The RTP transport URN used by every sender and receiver.
pub const TRANSPORT_RTP: &str = "urn:x-nmos:transport:rtp";

/// BCP-004-01 receiver capability constraint keys.
pub mod caps {
    pub const GRAIN_RATE: &str = "urn:x-nmos:cap:format:grain_rate";
    pub const FRAME_WIDTH: &str = "urn:x-nmos:cap:format:frame_width";
    pub const FRAME_HEIGHT: &str = "urn:x-nmos:cap:format:frame_height";
    pub const INTERLACE_MODE: &str = "urn:x-nmos:cap:format:interlace_mode";
    pub const COLOR_SAMPLING: &str = "urn:x-nmos:cap:format:color_sampling";
    pub const CHANNEL_COUNT: &str = "urn:x-nmos:cap:format:channel_count";
    pub const SAMPLE_RATE: &str = "urn:x-nmos:cap:format:sample_rate";
    pub const SAMPLE_DEPTH: &str = "urn:x-nmos:cap:format:sample_depth";
    pub const FORMAT_PROFILE: &str = "urn:x-nmos:cap:format:profile";
    pub const FORMAT_LEVEL: &str = "urn:x-nmos:cap:format:level";
    pub const FORMAT_SUBLEVEL: &str = "urn:x-nmos:cap:format:sublevel";
    pub const FORMAT_BIT_RATE: &str = "urn:x-nmos:cap:format:bit_rate";
    pub const TRANSPORT_BIT_RATE: &str = "urn:x-nmos:cap:transport:bit_rate";
    pub const TRANSPORT_PACKET_TIME: &str = "urn:x-nmos:cap:transport:packet_time";
    pub const TRANSPORT_MAX_PACKET_TIME: &str = "urn:x-nmos:cap:transport:max_packet_time";
    pub const TRANSPORT_PACKET_TRANSMISSION_MODE: &str =
        "urn:x-nmos:cap:transport:packet_transmission_mode";
}

/// IS-04 interlace mode tokens.
pub mod interlace_modes {
    pub const PROGRESSIVE: &str = "progressive";
    pub const INTERLACED_TFF: &str = "interlaced_tff";
    pub const INTERLACED_BFF: &str = "interlaced_bff";
    pub const INTERLACED_PSF: &str = "interlaced_psf";
}

pub fn rational_json(rational: Rational) -> Value {
    json!({
        "numerator": rational.numerator,
        "denominator": rational.denominator,
    })
}

fn resource_core(id: &Uuid, label: &str, description: &str, tags: Value) -> Map<String, Value> {
    let mut core = Map::new();
    core.insert("id".to_string(), json!(id.to_string()));
    core.insert("version".to_string(), json!(Version::now().to_string()));
    core.insert("label".to_string(), json!(label));
    core.insert("description".to_string(), json!(description));
    core.insert(
        "tags".to_string(),
        if tags.is_object() { tags } else { json!({}) },
    );
    core
}

/// An internal (free-running) node clock.
pub fn make_internal_clock(name: &str) -> Value {
    json!({
        "name": name,
        "ref_type": "internal",
    })
}

/// A PTP-locked node clock.
pub fn make_ptp_clock(name: &str, traceable: bool, gmid: &str, locked: bool) -> Value {
    json!({
        "name": name,
        "ref_type": "ptp",
        "traceable": traceable,
        "version": "IEEE1588-2008",
        "gmid": gmid,
        "locked": locked,
    })
}

/// The node resource, with no interfaces yet and the given clocks.
pub fn make_node(id: &Uuid, clocks: Vec<Value>, settings: &Settings) -> Value {
    let endpoints: Vec<Value> = settings
        .host_addresses
        .iter()
        .map(|address| {
            json!({
                "host": address,
                "port": settings.http_port,
                "protocol": "http",
            })
        })
        .collect();
    let mut node = resource_core(
        id,
        &settings.node_label,
        &settings.node_description,
        settings.node_tags.clone(),
    );
    node.insert("href".to_string(), json!(settings.http_href()));
    node.insert("hostname".to_string(), json!(settings.host_name));
    node.insert(
        "api".to_string(),
        json!({
            "versions": ["v1.3"],
            "endpoints": endpoints,
        }),
    );
    node.insert("caps".to_string(), json!({}));
    node.insert("services".to_string(), json!([]));
    node.insert("clocks".to_string(), Value::Array(clocks));
    node.insert("interfaces".to_string(), json!([]));
    Value::Object(node)
}

/// The node's `interfaces[]` entries for the given host interfaces.
pub fn make_node_interfaces(interfaces: &[&HostInterface]) -> Value {
    Value::Array(
        interfaces
            .iter()
            .map(|interface| {
                json!({
                    "name": interface.name,
                    "chassis_id": interface.port_id(),
                    "port_id": interface.port_id(),
                })
            })
            .collect(),
    )
}

/// The device resource, with empty sender/receiver arrays and the IS-05
/// control endpoint.
pub fn make_device(id: &Uuid, node_id: &Uuid, settings: &Settings) -> Value {
    let mut device = resource_core(
        id,
        &settings.device_label,
        &settings.device_description,
        settings.device_tags.clone(),
    );
    device.insert("type".to_string(), json!("urn:x-nmos:device:generic"));
    device.insert("node_id".to_string(), json!(node_id.to_string()));
    device.insert("senders".to_string(), json!([]));
    device.insert("receivers".to_string(), json!([]));
    device.insert(
        "controls".to_string(),
        json!([{
            "href": settings.connection_api_href(),
            "type": "urn:x-nmos:control:sr-ctrl/v1.1",
        }]),
    );
    Value::Object(device)
}

fn make_source(
    id: &Uuid,
    device_id: &Uuid,
    clock_name: &str,
    grain_rate: Rational,
    format: &str,
) -> Map<String, Value> {
    let mut source = resource_core(id, "", "", json!({}));
    source.insert("caps".to_string(), json!({}));
    source.insert("device_id".to_string(), json!(device_id.to_string()));
    source.insert("parents".to_string(), json!([]));
    source.insert("clock_name".to_string(), json!(clock_name));
    source.insert("grain_rate".to_string(), rational_json(grain_rate));
    source.insert("format".to_string(), json!(format));
    source
}

pub fn make_video_source(
    id: &Uuid,
    device_id: &Uuid,
    clock_name: &str,
    grain_rate: Rational,
) -> Value {
    Value::Object(make_source(
        id,
        device_id,
        clock_name,
        grain_rate,
        "urn:x-nmos:format:video",
    ))
}

pub fn make_audio_source(
    id: &Uuid,
    device_id: &Uuid,
    clock_name: &str,
    grain_rate: Rational,
    channel_count: u32,
) -> Value {
    let mut source = make_source(
        id,
        device_id,
        clock_name,
        grain_rate,
        "urn:x-nmos:format:audio",
    );
    // channel symbols are undefined unless the host supplies a channel
    // order the node can interpret
    let channels: Vec<Value> = (0..channel_count)
        .map(|index| {
            json!({
                "label": format!("Channel {}", index + 1),
                "symbol": format!("U{:02}", index + 1),
            })
        })
        .collect();
    source.insert("channels".to_string(), Value::Array(channels));
    Value::Object(source)
}

pub fn make_data_source(
    id: &Uuid,
    device_id: &Uuid,
    clock_name: &str,
    grain_rate: Rational,
) -> Value {
    Value::Object(make_source(
        id,
        device_id,
        clock_name,
        grain_rate,
        "urn:x-nmos:format:data",
    ))
}

pub fn make_mux_source(
    id: &Uuid,
    device_id: &Uuid,
    clock_name: &str,
    grain_rate: Rational,
) -> Value {
    Value::Object(make_source(
        id,
        device_id,
        clock_name,
        grain_rate,
        "urn:x-nmos:format:mux",
    ))
}

/// Component sampling grids for the common video samplings.
fn make_components(sampling: &str, width: u64, height: u64, depth: u32) -> Value {
    let component = |name: &str, w: u64, h: u64| {
        json!({
            "name": name,
            "width": w,
            "height": h,
            "bit_depth": depth,
        })
    };
    let components = match sampling {
        "YCbCr-4:4:4" => vec![
            component("Y", width, height),
            component("Cb", width, height),
            component("Cr", width, height),
        ],
        "YCbCr-4:2:2" => vec![
            component("Y", width, height),
            component("Cb", width / 2, height),
            component("Cr", width / 2, height),
        ],
        "YCbCr-4:2:0" => vec![
            component("Y", width, height),
            component("Cb", width / 2, height / 2),
            component("Cr", width / 2, height / 2),
        ],
        "RGB" => vec![
            component("R", width, height),
            component("G", width, height),
            component("B", width, height),
        ],
        _ => vec![],
    };
    Value::Array(components)
}

fn make_video_flow(
    id: &Uuid,
    source_id: &Uuid,
    device_id: &Uuid,
    grain_rate: Rational,
    width: u64,
    height: u64,
    interlace_mode: &str,
    colorspace: &str,
    transfer_characteristic: &str,
    media_type: &str,
) -> Map<String, Value> {
    let mut flow = resource_core(id, "", "", json!({}));
    flow.insert("grain_rate".to_string(), rational_json(grain_rate));
    flow.insert("source_id".to_string(), json!(source_id.to_string()));
    flow.insert("device_id".to_string(), json!(device_id.to_string()));
    flow.insert("parents".to_string(), json!([]));
    flow.insert("format".to_string(), json!("urn:x-nmos:format:video"));
    flow.insert("media_type".to_string(), json!(media_type));
    flow.insert("frame_width".to_string(), json!(width));
    flow.insert("frame_height".to_string(), json!(height));
    flow.insert("interlace_mode".to_string(), json!(interlace_mode));
    flow.insert("colorspace".to_string(), json!(colorspace));
    flow.insert(
        "transfer_characteristic".to_string(),
        json!(transfer_characteristic),
    );
    flow
}

#[allow(clippy::too_many_arguments)]
pub fn make_raw_video_flow(
    id: &Uuid,
    source_id: &Uuid,
    device_id: &Uuid,
    grain_rate: Rational,
    width: u64,
    height: u64,
    interlace_mode: &str,
    colorspace: &str,
    transfer_characteristic: &str,
    sampling: &str,
    depth: u32,
) -> Value {
    let mut flow = make_video_flow(
        id,
        source_id,
        device_id,
        grain_rate,
        width,
        height,
        interlace_mode,
        colorspace,
        transfer_characteristic,
        "video/raw",
    );
    flow.insert(
        "components".to_string(),
        make_components(sampling, width, height, depth),
    );
    Value::Object(flow)
}

#[allow(clippy::too_many_arguments)]
pub fn make_video_jxsv_flow(
    id: &Uuid,
    source_id: &Uuid,
    device_id: &Uuid,
    grain_rate: Rational,
    width: u64,
    height: u64,
    interlace_mode: &str,
    colorspace: &str,
    transfer_characteristic: &str,
    sampling: &str,
    depth: u32,
    profile: Option<&str>,
    level: Option<&str>,
    sublevel: Option<&str>,
    bit_rate: Option<u64>,
) -> Value {
    let mut flow = make_video_flow(
        id,
        source_id,
        device_id,
        grain_rate,
        width,
        height,
        interlace_mode,
        colorspace,
        transfer_characteristic,
        "video/jxsv",
    );
    flow.insert(
        "components".to_string(),
        make_components(sampling, width, height, depth),
    );
    if let Some(profile) = profile {
        flow.insert("profile".to_string(), json!(profile));
    }
    if let Some(level) = level {
        flow.insert("level".to_string(), json!(level));
    }
    if let Some(sublevel) = sublevel {
        flow.insert("sublevel".to_string(), json!(sublevel));
    }
    if let Some(bit_rate) = bit_rate {
        flow.insert("bit_rate".to_string(), json!(bit_rate));
    }
    Value::Object(flow)
}

pub fn make_raw_audio_flow(
    id: &Uuid,
    source_id: &Uuid,
    device_id: &Uuid,
    sample_rate: Rational,
    bit_depth: u32,
) -> Value {
    let mut flow = resource_core(id, "", "", json!({}));
    flow.insert("source_id".to_string(), json!(source_id.to_string()));
    flow.insert("device_id".to_string(), json!(device_id.to_string()));
    flow.insert("parents".to_string(), json!([]));
    flow.insert("format".to_string(), json!("urn:x-nmos:format:audio"));
    flow.insert(
        "media_type".to_string(),
        json!(format!("audio/L{}", bit_depth)),
    );
    flow.insert("sample_rate".to_string(), rational_json(sample_rate));
    flow.insert("bit_depth".to_string(), json!(bit_depth));
    Value::Object(flow)
}

pub fn make_sdianc_data_flow(
    id: &Uuid,
    source_id: &Uuid,
    device_id: &Uuid,
    did_sdids: &[(u8, u8)],
) -> Value {
    let mut flow = resource_core(id, "", "", json!({}));
    flow.insert("source_id".to_string(), json!(source_id.to_string()));
    flow.insert("device_id".to_string(), json!(device_id.to_string()));
    flow.insert("parents".to_string(), json!([]));
    flow.insert("format".to_string(), json!("urn:x-nmos:format:data"));
    flow.insert("media_type".to_string(), json!("video/smpte291"));
    if !did_sdids.is_empty() {
        let pairs: Vec<Value> = did_sdids
            .iter()
            .map(|(did, sdid)| {
                json!({
                    "DID": format!("0x{:02X}", did),
                    "SDID": format!("0x{:02X}", sdid),
                })
            })
            .collect();
        flow.insert("DID_SDID".to_string(), Value::Array(pairs));
    }
    Value::Object(flow)
}

pub fn make_mux_flow(id: &Uuid, source_id: &Uuid, device_id: &Uuid) -> Value {
    let mut flow = resource_core(id, "", "", json!({}));
    flow.insert("source_id".to_string(), json!(source_id.to_string()));
    flow.insert("device_id".to_string(), json!(device_id.to_string()));
    flow.insert("parents".to_string(), json!([]));
    flow.insert("format".to_string(), json!("urn:x-nmos:format:mux"));
    flow.insert("media_type".to_string(), json!("video/SMPTE2022-6"));
    Value::Object(flow)
}

pub fn make_sender(
    id: &Uuid,
    flow_id: &Uuid,
    transport: &str,
    device_id: &Uuid,
    manifest_href: &str,
    interface_bindings: &[String],
) -> Value {
    let mut sender = resource_core(id, "", "", json!({}));
    sender.insert("flow_id".to_string(), json!(flow_id.to_string()));
    sender.insert("transport".to_string(), json!(transport));
    sender.insert("device_id".to_string(), json!(device_id.to_string()));
    sender.insert("manifest_href".to_string(), json!(manifest_href));
    sender.insert(
        "interface_bindings".to_string(),
        json!(interface_bindings),
    );
    sender.insert(
        "subscription".to_string(),
        json!({
            "receiver_id": null,
            "active": false,
        }),
    );
    Value::Object(sender)
}

pub fn make_receiver(
    id: &Uuid,
    device_id: &Uuid,
    transport: &str,
    interface_bindings: &[String],
    format: &str,
    media_types: &[String],
) -> Value {
    let mut receiver = resource_core(id, "", "", json!({}));
    receiver.insert("device_id".to_string(), json!(device_id.to_string()));
    receiver.insert("transport".to_string(), json!(transport));
    receiver.insert(
        "interface_bindings".to_string(),
        json!(interface_bindings),
    );
    receiver.insert("format".to_string(), json!(format));
    receiver.insert(
        "caps".to_string(),
        json!({
            "media_types": media_types,
        }),
    );
    receiver.insert(
        "subscription".to_string(),
        json!({
            "sender_id": null,
            "active": false,
        }),
    );
    Value::Object(receiver)
}

/// `{"enum": [...]}` constraint over rationals.
pub fn make_caps_rational_constraint(values: &[Rational]) -> Value {
    json!({
        "enum": values.iter().map(|r| rational_json(*r)).collect::<Vec<_>>(),
    })
}

/// `{"enum": [...]}` constraint over integers.
pub fn make_caps_integer_constraint(values: &[i64]) -> Value {
    json!({ "enum": values })
}

/// `{"maximum": n}` constraint over integers.
pub fn make_caps_integer_maximum(maximum: i64) -> Value {
    json!({ "maximum": maximum })
}

/// `{"enum": [...]}` constraint over strings.
pub fn make_caps_string_constraint(values: &[&str]) -> Value {
    json!({ "enum": values })
}

/// `{"enum": [...]}` constraint over numbers.
pub fn make_caps_number_constraint(values: &[f64]) -> Value {
    json!({ "enum": values })
}
