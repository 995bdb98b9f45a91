//! Per-leg RTP transport parameters
//!
//! Extraction of IS-05 style transport parameters from a session
//! description (one set per media description, i.e. per redundant leg),
//! and the reverse: applying transport parameters back onto an SDP
//! skeleton to produce 'internal' SDP data (carrying the custom
//! `x-nvnmos-*` attributes) or the public form served from a sender's
//! `/transportfile` endpoint (custom attributes stripped).

use std::net::IpAddr;

use crate::attributes::{
    custom, names, parse_group, parse_source_filter, parse_ts_refclk, Group, SourceFilter,
    TsRefclk,
};
use crate::error::{Error, Result};
use crate::types::{Attribute, MediaDescription, SessionDescription};

/// A sender's source port: explicit, or left for IS-05 `auto` resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePort {
    Auto,
    Port(u16),
}

/// Transport parameters for one leg of an RTP sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderTransportParams {
    /// Interface address the stream is transmitted from.
    pub source_ip: Option<String>,
    pub destination_ip: String,
    pub destination_port: u16,
    pub source_port: SourcePort,
    pub rtp_enabled: bool,
}

/// Transport parameters for one leg of an RTP receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverTransportParams {
    /// Interface address the stream is received on.
    pub interface_ip: Option<String>,
    pub multicast_ip: Option<String>,
    pub source_ip: Option<String>,
    pub destination_port: u16,
    pub rtp_enabled: bool,
}

/// Whether SDP data describes a sender or a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Sender,
    Receiver,
}

/// Transport parameters for every leg of a sender or receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportParams {
    Sender(Vec<SenderTransportParams>),
    Receiver(Vec<ReceiverTransportParams>),
}

impl TransportParams {
    pub fn len(&self) -> usize {
        match self {
            TransportParams::Sender(legs) => legs.len(),
            TransportParams::Receiver(legs) => legs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            TransportParams::Sender(_) => EndpointKind::Sender,
            TransportParams::Receiver(_) => EndpointKind::Receiver,
        }
    }
}

fn is_multicast(address: &str) -> bool {
    address
        .parse::<IpAddr>()
        .map(|ip| ip.is_multicast())
        .unwrap_or(false)
}

fn media_source_filter(media: &MediaDescription) -> Result<Option<SourceFilter>> {
    media
        .attribute_value(names::SOURCE_FILTER)
        .map(parse_source_filter)
        .transpose()
}

/// Extract sender transport parameters, one per media description.
///
/// `source_ip` comes from `x-nvnmos-iface-ip`, falling back to the
/// inclusive `source-filter`; `destination_ip` from the connection line;
/// `source_port` from `x-nvnmos-src-port` when present, otherwise `auto`.
pub fn sender_transport_params(sdp: &SessionDescription) -> Result<Vec<SenderTransportParams>> {
    sdp.media
        .iter()
        .enumerate()
        .map(|(leg, media)| {
            let connection = sdp
                .connection_for(leg)
                .ok_or(Error::MissingField("c"))?;
            let filter = media_source_filter(media)?;
            let filter_source = filter
                .as_ref()
                .filter(|f| f.mode == crate::attributes::FilterMode::Include)
                .and_then(|f| f.src_addresses.first().cloned());
            let source_ip = media
                .attribute_value(custom::IFACE_IP)
                .map(str::to_string)
                .or(filter_source);
            let source_port = match media.attribute_value(custom::SRC_PORT) {
                Some(port) => SourcePort::Port(port.trim().parse()?),
                None => SourcePort::Auto,
            };
            Ok(SenderTransportParams {
                source_ip,
                destination_ip: connection.address.clone(),
                destination_port: media.port,
                source_port,
                rtp_enabled: !media.has_attribute(names::INACTIVE),
            })
        })
        .collect()
}

/// Extract receiver transport parameters, one per media description.
///
/// `interface_ip` comes from `x-nvnmos-iface-ip`, falling back to the
/// connection address when it is unicast; `multicast_ip` and `source_ip`
/// from the connection line and the inclusive `source-filter`.
pub fn receiver_transport_params(
    sdp: &SessionDescription,
) -> Result<Vec<ReceiverTransportParams>> {
    sdp.media
        .iter()
        .enumerate()
        .map(|(leg, media)| {
            let connection = sdp
                .connection_for(leg)
                .ok_or(Error::MissingField("c"))?;
            let multicast = is_multicast(&connection.address);
            let filter = media_source_filter(media)?;
            let source_ip = filter
                .as_ref()
                .filter(|f| f.mode == crate::attributes::FilterMode::Include)
                .and_then(|f| f.src_addresses.first().cloned());
            let interface_ip = media
                .attribute_value(custom::IFACE_IP)
                .map(str::to_string)
                .or_else(|| (!multicast).then(|| connection.address.clone()));
            Ok(ReceiverTransportParams {
                interface_ip,
                multicast_ip: multicast.then(|| connection.address.clone()),
                source_ip,
                destination_port: media.port,
                rtp_enabled: !media.has_attribute(names::INACTIVE),
            })
        })
        .collect()
}

/// The host-supplied unique identifier, from the session-level
/// `x-nvnmos-id` attribute.
pub fn internal_id(sdp: &SessionDescription) -> Option<&str> {
    sdp.attribute_value(custom::INTERNAL_ID)
}

/// The optional group hint tag, from the session-level
/// `x-nvnmos-group-hint` attribute.
pub fn group_hint(sdp: &SessionDescription) -> Option<&str> {
    sdp.attribute_value(custom::GROUP_HINT)
}

/// The optional session information (`i=`) line.
pub fn session_info(sdp: &SessionDescription) -> Option<&str> {
    sdp.information.as_deref()
}

/// `ts-refclk` references per leg, defaulting to the session-level
/// attributes for legs without their own.
pub fn ts_refclks(sdp: &SessionDescription) -> Result<Vec<Vec<TsRefclk>>> {
    let session_level: Vec<TsRefclk> = sdp
        .attributes
        .iter()
        .filter(|a| a.name == names::TS_REFCLK)
        .filter_map(|a| a.value.as_deref())
        .map(parse_ts_refclk)
        .collect::<Result<_>>()?;
    sdp.media
        .iter()
        .map(|media| {
            let media_level: Vec<TsRefclk> = media
                .attributes
                .iter()
                .filter(|a| a.name == names::TS_REFCLK)
                .filter_map(|a| a.value.as_deref())
                .map(parse_ts_refclk)
                .collect::<Result<_>>()?;
            Ok(if media_level.is_empty() {
                session_level.clone()
            } else {
                media_level
            })
        })
        .collect()
}

/// Replace the `ts-refclk` attributes of every media description.
pub fn set_media_ts_refclks(sdp: &mut SessionDescription, refclks: &[TsRefclk]) {
    sdp.remove_attributes(names::TS_REFCLK);
    for media in &mut sdp.media {
        media.remove_attributes(names::TS_REFCLK);
        for refclk in refclks {
            media
                .attributes
                .push(Attribute::value(names::TS_REFCLK, refclk.to_string()));
        }
    }
}

struct LegEdit {
    connection_address: String,
    filter_source: Option<String>,
    iface_ip: Option<String>,
    src_port: Option<u16>,
    destination_port: u16,
    rtp_enabled: bool,
}

fn leg_edits(params: &TransportParams) -> Result<Vec<LegEdit>> {
    match params {
        TransportParams::Sender(legs) => legs
            .iter()
            .map(|leg| {
                Ok(LegEdit {
                    connection_address: leg.destination_ip.clone(),
                    filter_source: leg.source_ip.clone(),
                    iface_ip: leg.source_ip.clone(),
                    src_port: match leg.source_port {
                        SourcePort::Port(port) => Some(port),
                        SourcePort::Auto => None,
                    },
                    destination_port: leg.destination_port,
                    rtp_enabled: leg.rtp_enabled,
                })
            })
            .collect(),
        TransportParams::Receiver(legs) => legs
            .iter()
            .map(|leg| {
                let connection_address = leg
                    .multicast_ip
                    .clone()
                    .or_else(|| leg.interface_ip.clone())
                    .ok_or_else(|| {
                        Error::FormatError("receiver leg has no destination address".to_string())
                    })?;
                Ok(LegEdit {
                    connection_address,
                    filter_source: leg.source_ip.clone(),
                    iface_ip: leg.interface_ip.clone(),
                    src_port: None,
                    destination_port: leg.destination_port,
                    rtp_enabled: leg.rtp_enabled,
                })
            })
            .collect(),
    }
}

/// Extend an SDP skeleton to the given leg count using ST 2022-7
/// duplication semantics: the first media description is replicated, the
/// session gains an `a=group:DUP` attribute, and each leg a distinct
/// `a=mid`.
fn extend_for_duplication(sdp: &mut SessionDescription, legs: usize) {
    if sdp.media.len() >= legs || sdp.media.is_empty() {
        return;
    }
    let template = sdp.media[0].clone();
    while sdp.media.len() < legs {
        sdp.media.push(template.clone());
    }

    let mids: Vec<String> = (0..legs).map(|i| i.to_string()).collect();
    let group = sdp
        .attribute_value(names::GROUP)
        .and_then(|value| parse_group(value).ok());
    if group.map_or(true, |g| g.mids.len() < legs) {
        sdp.remove_attributes(names::GROUP);
        sdp.attributes.push(Attribute::value(
            names::GROUP,
            Group::duplication(mids.clone()).to_string(),
        ));
    }
    for (media, mid) in sdp.media.iter_mut().zip(&mids) {
        media.remove_attributes(names::MID);
        media.attributes.push(Attribute::value(names::MID, mid));
    }
}

fn apply_leg(
    media: &mut MediaDescription,
    session_address: Option<&str>,
    edit: &LegEdit,
    internal_form: bool,
) -> Result<()> {
    media.port = edit.destination_port;

    match &mut media.connection {
        Some(connection) => connection.address = edit.connection_address.clone(),
        None => {
            // only add a media-level c= line when the session-level one no
            // longer describes this leg
            if session_address != Some(edit.connection_address.as_str()) {
                return Err(Error::FormatError(
                    "media description has no connection line".to_string(),
                ));
            }
        }
    }

    if let Some(value) = media.attribute_value(names::SOURCE_FILTER) {
        let mut filter = parse_source_filter(value)?;
        filter.dest_address = edit.connection_address.clone();
        if let Some(source) = &edit.filter_source {
            filter.src_addresses = vec![source.clone()];
        }
        let position = media
            .attributes
            .iter()
            .position(|a| a.name == names::SOURCE_FILTER)
            .unwrap_or(media.attributes.len());
        media.remove_attributes(names::SOURCE_FILTER);
        media.attributes.insert(
            position,
            Attribute::value(names::SOURCE_FILTER, filter.to_attribute_value()),
        );
    }

    media.remove_attributes(custom::IFACE_IP);
    media.remove_attributes(custom::SRC_PORT);
    media.remove_attributes(names::INACTIVE);

    if internal_form {
        let iface_ip = edit.iface_ip.as_deref().ok_or_else(|| {
            Error::FormatError("transport params have no interface address".to_string())
        })?;
        media
            .attributes
            .push(Attribute::value(custom::IFACE_IP, iface_ip));
        if let Some(port) = edit.src_port {
            media
                .attributes
                .push(Attribute::value(custom::SRC_PORT, port.to_string()));
        }
    }
    if !edit.rtp_enabled {
        media.attributes.push(Attribute::flag(names::INACTIVE));
    }
    Ok(())
}

/// Build 'internal' SDP data for a sender or receiver: the skeleton with
/// the given transport parameters applied and the custom session-level
/// (`x-nvnmos-id`, `x-nvnmos-group-hint`) and media-level
/// (`x-nvnmos-iface-ip`, `x-nvnmos-src-port`) attributes present. Legs
/// with `rtp_enabled` false carry `a=inactive`.
pub fn make_internal_session_description(
    internal_id: &str,
    group_hint: Option<&str>,
    session_info: Option<&str>,
    skeleton: &SessionDescription,
    params: &TransportParams,
) -> Result<SessionDescription> {
    let mut sdp = skeleton.clone();
    extend_for_duplication(&mut sdp, params.len());

    sdp.remove_attributes(custom::INTERNAL_ID);
    sdp.remove_attributes(custom::GROUP_HINT);
    sdp.attributes
        .push(Attribute::value(custom::INTERNAL_ID, internal_id));
    if let Some(hint) = group_hint {
        sdp.attributes
            .push(Attribute::value(custom::GROUP_HINT, hint));
    }
    if session_info.is_some() {
        sdp.information = session_info.map(str::to_string);
    }

    apply_transport_params(&mut sdp, params, true)?;
    Ok(sdp)
}

/// Build the public SDP served from a sender's `/transportfile` endpoint:
/// the skeleton with the active transport parameters applied and every
/// `x-nvnmos-*` attribute and fmtp parameter stripped.
pub fn make_transport_file_session_description(
    skeleton: &SessionDescription,
    params: &[SenderTransportParams],
) -> Result<SessionDescription> {
    let mut sdp = skeleton.clone();
    let params = TransportParams::Sender(params.to_vec());
    extend_for_duplication(&mut sdp, params.len());
    strip_custom_attributes(&mut sdp);
    apply_transport_params(&mut sdp, &params, false)?;
    Ok(sdp)
}

fn apply_transport_params(
    sdp: &mut SessionDescription,
    params: &TransportParams,
    internal_form: bool,
) -> Result<()> {
    if sdp.media.len() < params.len() {
        return Err(Error::FormatError(format!(
            "transport params for {} legs but SDP has {} media descriptions",
            params.len(),
            sdp.media.len()
        )));
    }
    let edits = leg_edits(params)?;
    let session_address = sdp.connection.as_ref().map(|c| c.address.clone());
    for (media, edit) in sdp.media.iter_mut().zip(&edits) {
        apply_leg(media, session_address.as_deref(), edit, internal_form)?;
    }
    Ok(())
}

/// Remove every custom `x-nvnmos-*` attribute and fmtp parameter.
pub fn strip_custom_attributes(sdp: &mut SessionDescription) {
    sdp.attributes.retain(|a| !a.name.starts_with(custom::PREFIX));
    for media in &mut sdp.media {
        media.attributes.retain(|a| !a.name.starts_with(custom::PREFIX));
        for attribute in &mut media.attributes {
            if attribute.name == names::FMTP {
                if let Some(value) = &attribute.value {
                    if let Ok(mut fmtp) = crate::attributes::parse_fmtp(value) {
                        if fmtp
                            .parameters
                            .iter()
                            .any(|(key, _)| key.starts_with(custom::PREFIX))
                        {
                            fmtp.remove_parameters_with_prefix(custom::PREFIX);
                            attribute.value = Some(fmtp.to_string());
                        }
                    }
                }
            }
        }
    }
}
