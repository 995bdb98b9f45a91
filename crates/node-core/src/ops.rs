//! Node-level operations
//!
//! The business rules over the model: initialization, adding and removing
//! senders and receivers based on SDP data, and the interface and clock
//! maintenance that keeps the node resource consistent with them.
//!
//! Every operation edits the model under the caller's write guard and
//! publishes exactly one change event before returning. All fallible
//! parsing and validation happens before the first store mutation, so a
//! failed operation leaves the model untouched.

use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use rnmos_sdp_core as sdp;
use rnmos_sdp_core::attributes::TsRefclk;
use rnmos_sdp_core::format::{media_kind, media_type_of, MediaKind, MediaType};
use rnmos_sdp_core::params::{
    AudioParams, PacketTransmissionMode, Smpte291Params, VideoJxsvParams, VideoRawParams,
};
use rnmos_sdp_core::types::{Bandwidth, Rational, SessionDescription};

use crate::clock::{make_node_clock, update_node_clock, CLOCK_NAME};
use crate::error::{Error, Result};
use crate::id::make_id;
use crate::interfaces::find_interface;
use crate::model::Model;
use crate::resolve::resolve_rtp_auto;
use crate::resources::build::{self, caps, interlace_modes, TRANSPORT_RTP};
use crate::resources::connection::{make_connection_rtp_receiver, make_connection_rtp_sender};
use crate::resources::{tags, Resource, ResourceKind};
use crate::version::Version;

/// Materialize the node and device resources from the settings.
pub fn init(model: &mut Model) -> Result<()> {
    let seed_id = model.settings.seed_id;
    let node_id = make_id(&seed_id, ResourceKind::Node, "");
    let device_id = make_id(&seed_id, ResourceKind::Device, "");

    let clocks = vec![build::make_internal_clock(CLOCK_NAME)];
    let node = build::make_node(&node_id, clocks, &model.settings);
    model
        .node_resources
        .insert(Resource::new(node_id, ResourceKind::Node, node))?;

    let device = build::make_device(&device_id, &node_id, &model.settings);
    model
        .node_resources
        .insert(Resource::new(device_id, ResourceKind::Device, device))?;

    model.settings.clocks.entry(CLOCK_NAME.to_string()).or_insert(0);

    model.notify();
    info!(node_id = %node_id, device_id = %device_id, "initialized node resources");
    Ok(())
}

fn bandwidths_of(sdp: &SessionDescription, leg: usize) -> &[Bandwidth] {
    let media = &sdp.media[leg];
    if media.bandwidths.is_empty() {
        &sdp.bandwidths
    } else {
        &media.bandwidths
    }
}

fn interface_names_for(
    model: &Model,
    addresses: &[Option<String>],
    internal_id: &str,
) -> Result<Vec<String>> {
    addresses
        .iter()
        .map(|address| {
            let address = address.clone().unwrap_or_default();
            match find_interface(&model.interfaces, &address) {
                Some(interface) => Ok(interface.name.clone()),
                None => {
                    error!(
                        address = %address,
                        internal_id = %internal_id,
                        "no network interface corresponding to the connection address"
                    );
                    Err(Error::NoInterface {
                        address,
                        internal_id: internal_id.to_string(),
                    })
                }
            }
        })
        .collect()
}

fn interlace_mode(interlace: bool) -> &'static str {
    if interlace {
        interlace_modes::INTERLACED_TFF
    } else {
        interlace_modes::PROGRESSIVE
    }
}

/// Parse sender SDP data and insert the source, flow, sender and
/// connection sender it describes. Returns the sender id.
pub fn add_sender(model: &mut Model, sdp_text: &str) -> Result<Uuid> {
    let session = sdp::parse_session_description(sdp_text)?;
    let transport = sdp::sender_transport_params(&session)?;
    if transport.is_empty() {
        return Err(Error::Validation(
            "sender SDP has no media descriptions".to_string(),
        ));
    }
    let refclks = sdp::ts_refclks(&session)?;
    let internal_id = sdp::internal_id(&session)
        .ok_or_else(|| Error::Validation("sender SDP has no x-nvnmos-id attribute".to_string()))?
        .to_string();
    let group_hint = sdp::group_hint(&session).map(str::to_string);
    let session_info = sdp::session_info(&session).unwrap_or_default().to_string();

    let seed_id = model.settings.seed_id;
    let node_id = make_id(&seed_id, ResourceKind::Node, "");
    let device_id = make_id(&seed_id, ResourceKind::Device, "");
    let source_id = make_id(&seed_id, ResourceKind::Source, &internal_id);
    let flow_id = make_id(&seed_id, ResourceKind::Flow, &internal_id);
    let sender_id = make_id(&seed_id, ResourceKind::Sender, &internal_id);

    if model.node_resources.get(&sender_id).is_some() {
        return Err(Error::Validation(format!(
            "a sender with internal id {} already exists",
            internal_id
        )));
    }

    let media_type = media_type_of(&session.media[0])?;
    let kind = media_kind(&media_type)?;
    let fmtp = sdp::params::find_fmtp(&session.media[0])?;
    let bandwidths = bandwidths_of(&session, 0);

    let source_addresses: Vec<Option<String>> =
        transport.iter().map(|leg| leg.source_ip.clone()).collect();
    let interface_names = interface_names_for(model, &source_addresses, &internal_id)?;

    // source and flow, by format
    let (source, flow) = match (kind, media_type.as_str()) {
        (MediaKind::Video, MediaType::VIDEO_RAW) => {
            let video = VideoRawParams::from_media(&session.media[0])?;
            let source = build::make_video_source(
                &source_id,
                &device_id,
                CLOCK_NAME,
                video.exact_framerate,
            );
            let flow = build::make_raw_video_flow(
                &flow_id,
                &source_id,
                &device_id,
                video.exact_framerate,
                video.width,
                video.height,
                interlace_mode(video.interlace),
                &video.colorimetry,
                &video.tcs,
                &video.sampling,
                video.depth,
            );
            (source, flow)
        }
        (MediaKind::Video, _) => {
            let video = VideoJxsvParams::from_media(&session.media[0])?;
            let format_bit_rate = sdp::bit_rate::format_bit_rate(fmtp.as_ref(), bandwidths);
            let source = build::make_video_source(
                &source_id,
                &device_id,
                CLOCK_NAME,
                video.exact_framerate,
            );
            let flow = build::make_video_jxsv_flow(
                &flow_id,
                &source_id,
                &device_id,
                video.exact_framerate,
                video.width,
                video.height,
                interlace_mode(video.interlace),
                &video.colorimetry,
                &video.tcs,
                &video.sampling,
                video.depth,
                video.profile.as_deref(),
                video.level.as_deref(),
                video.sublevel.as_deref(),
                format_bit_rate,
            );
            (source, flow)
        }
        (MediaKind::Audio, _) => {
            let audio = AudioParams::from_media(&session.media[0])?;
            let grain_rate = audio.sample_rate;
            let source = build::make_audio_source(
                &source_id,
                &device_id,
                CLOCK_NAME,
                grain_rate,
                audio.channel_count,
            );
            let mut flow = build::make_raw_audio_flow(
                &flow_id,
                &source_id,
                &device_id,
                audio.sample_rate,
                audio.bit_depth,
            );
            flow["grain_rate"] = build::rational_json(grain_rate);
            (source, flow)
        }
        (MediaKind::Data, _) => {
            let data = Smpte291Params::from_media(&session.media[0])?;
            let grain_rate = data.exact_framerate.unwrap_or(Rational::new(0, 1));
            let source =
                build::make_data_source(&source_id, &device_id, CLOCK_NAME, grain_rate);
            let did_sdids: Vec<(u8, u8)> = data
                .did_sdids
                .iter()
                .map(|pair| (pair.did, pair.sdid))
                .collect();
            let mut flow =
                build::make_sdianc_data_flow(&flow_id, &source_id, &device_id, &did_sdids);
            flow["grain_rate"] = build::rational_json(grain_rate);
            (source, flow)
        }
        (MediaKind::Mux, _) => {
            let mux = sdp::params::Smpte2022_6Params::from_media(&session.media[0])?;
            // ST 2022-6 SDP data rarely carries a frame rate; assume 50 Hz
            let grain_rate = mux.exact_framerate.unwrap_or(Rational::new(50, 1));
            let source = build::make_mux_source(&source_id, &device_id, CLOCK_NAME, grain_rate);
            let mut flow = build::make_mux_flow(&flow_id, &source_id, &device_id);
            flow["grain_rate"] = build::rational_json(grain_rate);
            (source, flow)
        }
    };

    // sender
    let manifest_href = model.settings.manifest_href(&sender_id);
    let mut sender_data = build::make_sender(
        &sender_id,
        &flow_id,
        TRANSPORT_RTP,
        &device_id,
        &manifest_href,
        &interface_names,
    );
    if media_type.as_str() == MediaType::VIDEO_JXSV {
        // additional attributes recommended by BCP-006-01 for senders
        let video = VideoJxsvParams::from_media(&session.media[0])?;
        if let Some(bit_rate) = sdp::bit_rate::transport_bit_rate(fmtp.as_ref(), bandwidths) {
            sender_data["bit_rate"] = json!(bit_rate);
        }
        if video.packet_transmission_mode != PacketTransmissionMode::Codestream {
            sender_data["packet_transmission_mode"] =
                json!(video.packet_transmission_mode.as_str());
        }
        if let Some(sender_type) = &video.sender_type {
            sender_data["st2110_21_sender_type"] = json!(sender_type);
        }
    }
    sender_data["label"] = json!(session.session_name);
    sender_data["description"] = json!(session_info);
    let mut sender = Resource::new(sender_id, ResourceKind::Sender, sender_data);
    sender.set_tag(tags::INTERNAL_ID, &internal_id);
    if let Some(hint) = &group_hint {
        sender.set_tag(tags::GROUP_HINT, hint);
    }

    // connection sender, constrained to the configured interfaces, with
    // the active endpoint's auto values resolved up front
    let mut connection_data = make_connection_rtp_sender(&sender_id, transport.len());
    for (leg, params) in transport.iter().enumerate() {
        connection_data["endpoint_constraints"][leg]["source_ip"] = json!({
            "enum": [params.source_ip.clone().unwrap_or_default()],
        });
    }
    {
        let constraints = connection_data["endpoint_constraints"].clone();
        resolve_rtp_auto(
            ResourceKind::Sender,
            &sender_id,
            &constraints,
            &mut connection_data["endpoint_active"]["transport_params"],
        )?;
    }

    model
        .node_resources
        .insert(Resource::new(source_id, ResourceKind::Source, source))?;
    model
        .node_resources
        .insert(Resource::new(flow_id, ResourceKind::Flow, flow))?;
    model.node_resources.insert(sender)?;
    model.connection_resources.insert(Resource::new(
        sender_id,
        ResourceKind::Sender,
        connection_data,
    ))?;

    // update the device's deprecated senders array
    model.node_resources.modify(&device_id, |device| {
        if let Some(senders) = device.data["senders"].as_array_mut() {
            senders.push(json!(sender_id.to_string()));
        }
    })?;

    update_node_interfaces(model, &node_id)?;

    // upgrade the node clock when the sender carries a PTP reference
    let mut ptp_domain = model
        .settings
        .clocks
        .get(CLOCK_NAME)
        .copied()
        .unwrap_or_default();
    let clock = make_node_clock(CLOCK_NAME, &refclks, &mut ptp_domain);
    update_node_clock(&mut model.node_resources, &node_id, clock)?;
    model
        .settings
        .clocks
        .insert(CLOCK_NAME.to_string(), ptp_domain);

    model
        .settings
        .senders
        .insert(sender_id, sdp_text.to_string());

    model.notify();
    info!(sender_id = %sender_id, internal_id = %internal_id, "added sender");
    Ok(sender_id)
}

fn receiver_constraint_sets(
    session: &SessionDescription,
    media_type: &MediaType,
    kind: MediaKind,
) -> Result<Option<Value>> {
    let fmtp = sdp::params::find_fmtp(&session.media[0])?;
    let bandwidths = bandwidths_of(session, 0);
    let set = match (kind, media_type.as_str()) {
        (MediaKind::Video, MediaType::VIDEO_RAW) => {
            let video = VideoRawParams::from_media(&session.media[0])?;
            let modes: Vec<&str> = if video.interlace {
                vec![
                    interlace_modes::INTERLACED_BFF,
                    interlace_modes::INTERLACED_TFF,
                    interlace_modes::INTERLACED_PSF,
                ]
            } else {
                vec![interlace_modes::PROGRESSIVE]
            };
            Some(json!({
                (caps::GRAIN_RATE): build::make_caps_rational_constraint(&[video.exact_framerate]),
                (caps::FRAME_WIDTH): build::make_caps_integer_constraint(&[video.width as i64]),
                (caps::FRAME_HEIGHT): build::make_caps_integer_constraint(&[video.height as i64]),
                (caps::INTERLACE_MODE): build::make_caps_string_constraint(&modes),
                (caps::COLOR_SAMPLING): build::make_caps_string_constraint(&[&video.sampling]),
            }))
        }
        (MediaKind::Video, _) => {
            let video = VideoJxsvParams::from_media(&session.media[0])?;
            let mut set = serde_json::Map::new();
            if let Some(profile) = &video.profile {
                set.insert(
                    caps::FORMAT_PROFILE.to_string(),
                    build::make_caps_string_constraint(&[profile]),
                );
            }
            if let Some(level) = &video.level {
                set.insert(
                    caps::FORMAT_LEVEL.to_string(),
                    build::make_caps_string_constraint(&[level]),
                );
            }
            if let Some(sublevel) = &video.sublevel {
                set.insert(
                    caps::FORMAT_SUBLEVEL.to_string(),
                    build::make_caps_string_constraint(&[sublevel]),
                );
            }
            if let Some(bit_rate) = sdp::bit_rate::format_bit_rate(fmtp.as_ref(), bandwidths) {
                set.insert(
                    caps::FORMAT_BIT_RATE.to_string(),
                    build::make_caps_integer_maximum(bit_rate as i64),
                );
            }
            if let Some(bit_rate) = sdp::bit_rate::transport_bit_rate(fmtp.as_ref(), bandwidths)
            {
                set.insert(
                    caps::TRANSPORT_BIT_RATE.to_string(),
                    build::make_caps_integer_maximum(bit_rate as i64),
                );
            }
            set.insert(
                caps::TRANSPORT_PACKET_TRANSMISSION_MODE.to_string(),
                build::make_caps_string_constraint(&[video.packet_transmission_mode.as_str()]),
            );
            Some(Value::Object(set))
        }
        (MediaKind::Audio, _) => {
            let audio = AudioParams::from_media(&session.media[0])?;
            let mut set = serde_json::Map::new();
            set.insert(
                caps::CHANNEL_COUNT.to_string(),
                build::make_caps_integer_constraint(&[audio.channel_count as i64]),
            );
            set.insert(
                caps::SAMPLE_RATE.to_string(),
                build::make_caps_rational_constraint(&[audio.sample_rate]),
            );
            set.insert(
                caps::SAMPLE_DEPTH.to_string(),
                build::make_caps_integer_constraint(&[audio.bit_depth as i64]),
            );
            if let Some(packet_time) = audio.packet_time {
                set.insert(
                    caps::TRANSPORT_PACKET_TIME.to_string(),
                    build::make_caps_number_constraint(&[packet_time]),
                );
            }
            if let Some(max_packet_time) = audio.max_packet_time {
                set.insert(
                    caps::TRANSPORT_MAX_PACKET_TIME.to_string(),
                    build::make_caps_number_constraint(&[max_packet_time]),
                );
            }
            Some(Value::Object(set))
        }
        (MediaKind::Data, _) => {
            let data = Smpte291Params::from_media(&session.media[0])?;
            data.exact_framerate.map(|rate| {
                json!({
                    (caps::GRAIN_RATE): build::make_caps_rational_constraint(&[rate]),
                })
            })
        }
        (MediaKind::Mux, _) => None,
    };
    Ok(set)
}

/// Parse receiver SDP data and insert the receiver and connection
/// receiver it describes. Returns the receiver id.
pub fn add_receiver(model: &mut Model, sdp_text: &str) -> Result<Uuid> {
    let session = sdp::parse_session_description(sdp_text)?;
    let transport = sdp::receiver_transport_params(&session)?;
    if transport.is_empty() {
        return Err(Error::Validation(
            "receiver SDP has no media descriptions".to_string(),
        ));
    }
    let internal_id = sdp::internal_id(&session)
        .ok_or_else(|| Error::Validation("receiver SDP has no x-nvnmos-id attribute".to_string()))?
        .to_string();
    let group_hint = sdp::group_hint(&session).map(str::to_string);
    let session_info = sdp::session_info(&session).unwrap_or_default().to_string();

    let seed_id = model.settings.seed_id;
    let node_id = make_id(&seed_id, ResourceKind::Node, "");
    let device_id = make_id(&seed_id, ResourceKind::Device, "");
    let receiver_id = make_id(&seed_id, ResourceKind::Receiver, &internal_id);

    if model.node_resources.get(&receiver_id).is_some() {
        return Err(Error::Validation(format!(
            "a receiver with internal id {} already exists",
            internal_id
        )));
    }

    let media_type = media_type_of(&session.media[0])?;
    let kind = media_kind(&media_type)?;

    let interface_addresses: Vec<Option<String>> = transport
        .iter()
        .map(|leg| leg.interface_ip.clone())
        .collect();
    let interface_names = interface_names_for(model, &interface_addresses, &internal_id)?;

    // the accepted media type: the specific PCM depth for audio, the
    // described type otherwise
    let media_types = vec![media_type.as_str().to_string()];

    let mut receiver_data = build::make_receiver(
        &receiver_id,
        &device_id,
        TRANSPORT_RTP,
        &interface_names,
        kind.format_urn(),
        &media_types,
    );
    if let Some(constraint_set) = receiver_constraint_sets(&session, &media_type, kind)? {
        receiver_data["caps"]["constraint_sets"] = json!([constraint_set]);
        receiver_data["caps"]["version"] = json!(Version::now().to_string());
    }
    receiver_data["label"] = json!(session.session_name);
    receiver_data["description"] = json!(session_info);
    let mut receiver = Resource::new(receiver_id, ResourceKind::Receiver, receiver_data);
    receiver.set_tag(tags::INTERNAL_ID, &internal_id);
    if let Some(hint) = &group_hint {
        receiver.set_tag(tags::GROUP_HINT, hint);
    }

    let mut connection_data = make_connection_rtp_receiver(&receiver_id, transport.len());
    for (leg, params) in transport.iter().enumerate() {
        connection_data["endpoint_constraints"][leg]["interface_ip"] = json!({
            "enum": [params.interface_ip.clone().unwrap_or_default()],
        });
    }
    {
        let constraints = connection_data["endpoint_constraints"].clone();
        resolve_rtp_auto(
            ResourceKind::Receiver,
            &receiver_id,
            &constraints,
            &mut connection_data["endpoint_active"]["transport_params"],
        )?;
    }

    model.node_resources.insert(receiver)?;
    model.connection_resources.insert(Resource::new(
        receiver_id,
        ResourceKind::Receiver,
        connection_data,
    ))?;

    model.node_resources.modify(&device_id, |device| {
        if let Some(receivers) = device.data["receivers"].as_array_mut() {
            receivers.push(json!(receiver_id.to_string()));
        }
    })?;

    update_node_interfaces(model, &node_id)?;

    model
        .settings
        .receivers
        .insert(receiver_id, sdp_text.to_string());

    model.notify();
    info!(receiver_id = %receiver_id, internal_id = %internal_id, "added receiver");
    Ok(receiver_id)
}

/// Remove the sender with the given internal id, cascading to its flow
/// and source.
pub fn remove_sender(model: &mut Model, internal_id: &str) -> Result<()> {
    remove_connection(model, ResourceKind::Sender, internal_id)
}

/// Remove the receiver with the given internal id.
pub fn remove_receiver(model: &mut Model, internal_id: &str) -> Result<()> {
    remove_connection(model, ResourceKind::Receiver, internal_id)
}

fn remove_connection(model: &mut Model, kind: ResourceKind, internal_id: &str) -> Result<()> {
    let seed_id = model.settings.seed_id;
    let node_id = make_id(&seed_id, ResourceKind::Node, "");
    let id = make_id(&seed_id, kind, internal_id);

    let Some(resource) = model.node_resources.find(&id, kind) else {
        error!(kind = %kind, internal_id = %internal_id, "could not find resource to remove");
        return Err(Error::UnknownInternalId {
            kind: kind.to_string(),
            internal_id: internal_id.to_string(),
        });
    };

    let device_id: Uuid = resource.data["device_id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| Error::Internal("resource has no device_id".to_string()))?;

    // for a sender, the cascade reaches its flow and then its source
    let mut flow_id = None;
    let mut source_id = None;
    if kind == ResourceKind::Sender {
        if let Some(fid) = resource.data["flow_id"].as_str().and_then(|id| id.parse().ok()) {
            if let Some(flow) = model.node_resources.find(&fid, ResourceKind::Flow) {
                source_id = flow.data["source_id"]
                    .as_str()
                    .and_then(|id| id.parse().ok());
            }
            flow_id = Some(fid);
        }
    }

    model.connection_resources.erase(&id);
    model.node_resources.erase(&id);
    if let Some(flow_id) = &flow_id {
        model.node_resources.erase(flow_id);
    }
    if let Some(source_id) = &source_id {
        model.node_resources.erase(source_id);
    }

    // update the device's deprecated senders/receivers array
    let refs_key = match kind {
        ResourceKind::Sender => "senders",
        _ => "receivers",
    };
    let device_has_ref = model
        .node_resources
        .get(&device_id)
        .map(|device| {
            device.data[refs_key]
                .as_array()
                .map(|refs| refs.iter().any(|r| r == &json!(id.to_string())))
                .unwrap_or(false)
        })
        .unwrap_or(false);
    if device_has_ref {
        model.node_resources.modify(&device_id, |device| {
            if let Some(refs) = device.data[refs_key].as_array_mut() {
                refs.retain(|r| r != &json!(id.to_string()));
            }
        })?;
    }

    update_node_interfaces(model, &node_id)?;

    match kind {
        ResourceKind::Sender => {
            model.settings.senders.remove(&id);
            // the node clock follows the remaining senders; removing the
            // last PTP-referenced sender reverts it to an internal clock
            update_clock_from_remaining_senders(model, &node_id)?;
        }
        _ => {
            model.settings.receivers.remove(&id);
        }
    }

    model.notify();
    info!(kind = %kind, internal_id = %internal_id, "removed resource");
    Ok(())
}

fn update_clock_from_remaining_senders(model: &mut Model, node_id: &Uuid) -> Result<()> {
    let mut combined: Vec<TsRefclk> = Vec::new();
    for sdp_text in model.settings.senders.values() {
        let Ok(session) = sdp::parse_session_description(sdp_text) else {
            continue;
        };
        if let Ok(refclks) = sdp::ts_refclks(&session) {
            if let Some(first_leg) = refclks.into_iter().next() {
                combined.extend(first_leg);
            }
        }
    }
    let legs = if combined.is_empty() {
        Vec::new()
    } else {
        vec![combined]
    };
    let mut ptp_domain = model
        .settings
        .clocks
        .get(CLOCK_NAME)
        .copied()
        .unwrap_or_default();
    let clock = make_node_clock(CLOCK_NAME, &legs, &mut ptp_domain);
    update_node_clock(&mut model.node_resources, node_id, clock)?;
    model
        .settings
        .clocks
        .insert(CLOCK_NAME.to_string(), ptp_domain);
    Ok(())
}

/// Recompute the node's `interfaces[]` as exactly the set referenced by
/// some sender's or receiver's interface bindings; the node resource is
/// only touched when the set changed.
pub fn update_node_interfaces(model: &mut Model, node_id: &Uuid) -> Result<()> {
    let mut names: Vec<&str> = Vec::new();
    for kind in [ResourceKind::Sender, ResourceKind::Receiver] {
        for resource in model.node_resources.iter_kind(kind) {
            for binding in crate::resources::fields::interface_bindings(&resource.data) {
                if !names.contains(&binding) {
                    names.push(binding);
                }
            }
        }
    }

    let referenced: Vec<&crate::interfaces::HostInterface> = model
        .interfaces
        .iter()
        .filter(|interface| names.contains(&interface.name.as_str()))
        .collect();
    let interfaces = build::make_node_interfaces(&referenced);

    let node = model
        .node_resources
        .find(node_id, ResourceKind::Node)
        .ok_or_else(|| Error::Internal("node resource is missing".to_string()))?;
    if node.data["interfaces"] == interfaces {
        return Ok(());
    }
    model.node_resources.modify(node_id, |node| {
        node.data["interfaces"] = interfaces;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::HostInterface;
    use crate::settings::Settings;

    const SEED: &str = "nmos-api.local:8080";

    fn video_sender_sdp() -> String {
        "v=0\r\n\
         o=- 1697705406 1697705406 IN IP4 192.0.2.10\r\n\
         s=NvNmos Video Sender\r\n\
         i=YCbCr-4:2:2, 10 bit, 1920 x 1080, progressive, 50 Hz\r\n\
         t=0 0\r\n\
         a=x-nvnmos-id:sink-0\r\n\
         a=x-nvnmos-group-hint:tx-0:video\r\n\
         m=video 5020 RTP/AVP 96\r\n\
         c=IN IP4 233.252.0.0/64\r\n\
         a=source-filter: incl IN IP4 233.252.0.0 192.0.2.10\r\n\
         a=x-nvnmos-iface-ip:192.0.2.10\r\n\
         a=x-nvnmos-src-port:5004\r\n\
         a=rtpmap:96 raw/90000\r\n\
         a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN; \r\n\
         a=ts-refclk:ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42\r\n\
         a=ts-refclk:ptp=IEEE1588-2008:traceable\r\n\
         a=mediaclk:direct=0\r\n"
            .to_string()
    }

    fn audio_receiver_sdp() -> String {
        "v=0\r\n\
         o=- 1697705406 1697705406 IN IP4 192.0.2.10\r\n\
         s=NvNmos Audio Receiver\r\n\
         i=2 ch, 48 kHz, 24 bit\r\n\
         t=0 0\r\n\
         a=x-nvnmos-id:source-1\r\n\
         m=audio 5030 RTP/AVP 97\r\n\
         c=IN IP4 233.252.0.1/64\r\n\
         a=source-filter: incl IN IP4 233.252.0.1 192.0.2.1\r\n\
         a=x-nvnmos-iface-ip:192.0.2.10\r\n\
         a=rtpmap:97 L24/48000/2\r\n\
         a=fmtp:97 channel-order=SMPTE2110.(ST); \r\n\
         a=ptime:1\r\n\
         a=mediaclk:direct=0\r\n"
            .to_string()
    }

    fn test_model() -> Model {
        let settings = Settings::for_host(
            "nmos-api.local",
            &["192.0.2.10".to_string()],
            8080,
            SEED,
        );
        let mut model = Model::new(
            settings,
            vec![HostInterface::from_address("192.0.2.10")],
        );
        init(&mut model).unwrap();
        model
    }

    fn node_of(model: &Model) -> &Resource {
        let node_id = make_id(&model.settings.seed_id, ResourceKind::Node, "");
        model
            .node_resources
            .find(&node_id, ResourceKind::Node)
            .unwrap()
    }

    #[test]
    fn test_init_creates_node_and_device() {
        let model = test_model();
        assert_eq!(model.node_resources.len(), 2);
        let node = node_of(&model);
        assert_eq!(node.data["clocks"][0]["name"], "clk0");
        assert_eq!(node.data["clocks"][0]["ref_type"], "internal");
        assert!(node.data["interfaces"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_add_sender_creates_bundle() {
        let mut model = test_model();
        let sender_id = add_sender(&mut model, &video_sender_sdp()).unwrap();

        let expected = make_id(&model.settings.seed_id, ResourceKind::Sender, "sink-0");
        assert_eq!(sender_id, expected);

        // source, flow, sender present
        assert_eq!(model.node_resources.iter_kind(ResourceKind::Source).count(), 1);
        assert_eq!(model.node_resources.iter_kind(ResourceKind::Flow).count(), 1);
        let sender = model
            .node_resources
            .find(&sender_id, ResourceKind::Sender)
            .unwrap();
        assert_eq!(sender.internal_id(), Some("sink-0"));
        assert_eq!(sender.group_hint(), Some("tx-0:video"));
        assert_eq!(sender.data["label"], "NvNmos Video Sender");
        assert_eq!(
            crate::resources::fields::interface_bindings(&sender.data),
            vec!["192.0.2.10"]
        );

        // connection twin with resolved active params
        let connection = model
            .connection_resources
            .find(&sender_id, ResourceKind::Sender)
            .unwrap();
        let active = &connection.data["endpoint_active"]["transport_params"][0];
        assert_eq!(active["source_ip"], "192.0.2.10");

        // clock upgraded to PTP with the lowercased gmid
        let node = node_of(&model);
        assert_eq!(node.data["clocks"][0]["ref_type"], "ptp");
        assert_eq!(node.data["clocks"][0]["gmid"], "ac-de-48-23-45-67-01-9f");
        assert_eq!(model.settings.clocks["clk0"], 42);

        // interfaces now include the bound host interface
        assert_eq!(node.data["interfaces"][0]["name"], "192.0.2.10");

        // device's deprecated senders array lists the new sender
        let device_id = make_id(&model.settings.seed_id, ResourceKind::Device, "");
        let device = model.node_resources.get(&device_id).unwrap();
        assert_eq!(device.data["senders"][0], sender_id.to_string());
    }

    #[test]
    fn test_add_sender_unknown_interface_fails_clean() {
        let mut model = test_model();
        let sdp_text = video_sender_sdp().replace("192.0.2.10", "198.51.100.99");
        let before = model.node_resources.len();
        assert!(matches!(
            add_sender(&mut model, &sdp_text),
            Err(Error::NoInterface { .. })
        ));
        assert_eq!(model.node_resources.len(), before);
        assert!(model.settings.senders.is_empty());
    }

    #[test]
    fn test_add_sender_duplicate_fails() {
        let mut model = test_model();
        add_sender(&mut model, &video_sender_sdp()).unwrap();
        assert!(matches!(
            add_sender(&mut model, &video_sender_sdp()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_add_receiver_capabilities() {
        let mut model = test_model();
        let receiver_id = add_receiver(&mut model, &audio_receiver_sdp()).unwrap();

        let receiver = model
            .node_resources
            .find(&receiver_id, ResourceKind::Receiver)
            .unwrap();
        assert_eq!(receiver.data["format"], "urn:x-nmos:format:audio");
        assert_eq!(receiver.data["caps"]["media_types"][0], "audio/L24");
        let set = &receiver.data["caps"]["constraint_sets"][0];
        assert_eq!(set[caps::CHANNEL_COUNT]["enum"][0], 2);
        assert_eq!(set[caps::SAMPLE_RATE]["enum"][0]["numerator"], 48000);
        assert_eq!(set[caps::SAMPLE_DEPTH]["enum"][0], 24);
        assert_eq!(set[caps::TRANSPORT_PACKET_TIME]["enum"][0], 1.0);
        assert!(set[caps::TRANSPORT_MAX_PACKET_TIME].is_null());
    }

    #[test]
    fn test_remove_sender_cascades() {
        let mut model = test_model();
        let sender_id = add_sender(&mut model, &video_sender_sdp()).unwrap();
        remove_sender(&mut model, "sink-0").unwrap();

        assert!(model.node_resources.get(&sender_id).is_none());
        assert_eq!(model.node_resources.iter_kind(ResourceKind::Flow).count(), 0);
        assert_eq!(model.node_resources.iter_kind(ResourceKind::Source).count(), 0);
        assert!(model.connection_resources.is_empty());
        assert!(model.settings.senders.is_empty());

        // interfaces drop back to empty, clock reverts to internal
        let node = node_of(&model);
        assert!(node.data["interfaces"].as_array().unwrap().is_empty());
        assert_eq!(node.data["clocks"][0]["ref_type"], "internal");

        // device's senders array is empty again
        let device_id = make_id(&model.settings.seed_id, ResourceKind::Device, "");
        let device = model.node_resources.get(&device_id).unwrap();
        assert!(device.data["senders"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_remove_unknown_fails() {
        let mut model = test_model();
        assert!(matches!(
            remove_sender(&mut model, "nope"),
            Err(Error::UnknownInternalId { .. })
        ));
    }

    #[test]
    fn test_readd_same_id_same_uuid_greater_version() {
        let mut model = test_model();
        let first = add_sender(&mut model, &video_sender_sdp()).unwrap();
        let first_version = model
            .node_resources
            .get(&first)
            .unwrap()
            .version()
            .unwrap();
        remove_sender(&mut model, "sink-0").unwrap();
        let second = add_sender(&mut model, &video_sender_sdp()).unwrap();
        assert_eq!(first, second);
        let second_version = model
            .node_resources
            .get(&second)
            .unwrap()
            .version()
            .unwrap();
        assert!(second_version > first_version);
    }

    #[test]
    fn test_receiver_removal_keeps_other_interfaces() {
        let mut model = test_model();
        add_sender(&mut model, &video_sender_sdp()).unwrap();
        add_receiver(&mut model, &audio_receiver_sdp()).unwrap();
        remove_receiver(&mut model, "source-1").unwrap();

        // the sender still references the interface
        let node = node_of(&model);
        assert_eq!(node.data["interfaces"].as_array().unwrap().len(), 1);
    }
}
