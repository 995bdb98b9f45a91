//! Sender transport file synthesis
//!
//! A sender's `/transportfile` endpoint serves SDP data rebuilt from the
//! original SDP skeleton the sender was configured with, the currently
//! active transport parameters, and the node's current clock. Custom
//! `x-nvnmos-*` attributes never appear in it.

use serde_json::Value;
use tracing::debug;

use rnmos_node_core::model::Model;
use rnmos_node_core::resources::connection::sender_params_from_json;
use rnmos_node_core::resources::{fields, Resource, ResourceKind};
use rnmos_sdp_core as sdp;
use rnmos_sdp_core::attributes::TsRefclk;

use crate::error::{Error, Result};

/// Find the source feeding a sender, through its flow.
pub fn find_source_for_sender<'a>(model: &'a Model, sender: &Resource) -> Option<&'a Resource> {
    let flow_id = fields::flow_id(&sender.data)?.parse().ok()?;
    let flow = model.node_resources.find(&flow_id, ResourceKind::Flow)?;
    let source_id = fields::source_id(&flow.data)?.parse().ok()?;
    model.node_resources.find(&source_id, ResourceKind::Source)
}

/// Build the `ts-refclk` references matching a node clock.
///
/// A PTP clock known only to be traceable becomes the traceable form; a
/// PTP clock with a grandmaster carries the gmid and the current domain;
/// an internal clock becomes a `localmac` reference using the sender's
/// first bound interface.
fn make_ts_refclks(clock: &Value, ptp_domain: i64, local_mac: &str) -> Vec<TsRefclk> {
    if clock["ref_type"] == "ptp" {
        let traceable = clock["traceable"].as_bool().unwrap_or(false);
        let gmid = clock["gmid"].as_str().unwrap_or_default();
        let mut refclks = Vec::new();
        if !gmid.is_empty() && gmid != "ff-ff-ff-ff-ff-ff-ff-ff" {
            refclks.push(TsRefclk::Ptp {
                version: "IEEE1588-2008".to_string(),
                gmid: gmid.to_string(),
                domain: Some(ptp_domain.max(0) as u32),
            });
        }
        if traceable {
            refclks.push(TsRefclk::PtpTraceable {
                version: "IEEE1588-2008".to_string(),
            });
        }
        if refclks.is_empty() {
            refclks.push(TsRefclk::PtpTraceable {
                version: "IEEE1588-2008".to_string(),
            });
        }
        refclks
    } else {
        vec![TsRefclk::LocalMac {
            mac: local_mac.to_uppercase(),
        }]
    }
}

/// Rebuild a sender's transport file from the model.
///
/// Returns `None` when the sender has no retained SDP configuration (so
/// the endpoint stays empty). The origin session version is refreshed to
/// the given NTP seconds.
pub fn make_transport_file(
    model: &Model,
    sender: &Resource,
    connection_sender: &Resource,
    ntp_seconds: u64,
) -> Result<Option<String>> {
    let Some(sdp_text) = model.settings.senders.get(&sender.id) else {
        debug!(sender_id = %sender.id, "no retained SDP for sender; leaving transport file empty");
        return Ok(None);
    };
    if fields::transport(&sender.data) != Some(rnmos_node_core::resources::build::TRANSPORT_RTP) {
        return Ok(None);
    }

    let skeleton = sdp::parse_session_description(sdp_text)?;

    let active_params = &connection_sender.data["endpoint_active"]["transport_params"];
    let params = sender_params_from_json(active_params)?;

    let mut transport_file = sdp::make_transport_file_session_description(&skeleton, &params)?;

    // rebuild ts-refclk from the node's current clock
    let node_id = rnmos_node_core::make_id(&model.settings.seed_id, ResourceKind::Node, "");
    let node = model
        .node_resources
        .find(&node_id, ResourceKind::Node)
        .ok_or_else(|| Error::Internal("node resource is missing".to_string()))?;
    let source = find_source_for_sender(model, sender)
        .ok_or_else(|| Error::Internal("sender has no source".to_string()))?;
    let clock_name = fields::clock_name(&source.data)
        .ok_or_else(|| Error::Internal("source has no clock".to_string()))?;
    let clock = node.data["clocks"]
        .as_array()
        .and_then(|clocks| clocks.iter().find(|c| c["name"] == clock_name))
        .ok_or_else(|| Error::Internal(format!("node has no clock named {}", clock_name)))?;
    let ptp_domain = model
        .settings
        .clocks
        .get(clock_name)
        .copied()
        .unwrap_or_default();
    let local_mac = fields::interface_bindings(&sender.data)
        .first()
        .and_then(|name| {
            model
                .interfaces
                .iter()
                .find(|interface| interface.name == *name)
        })
        .map(|interface| interface.port_id())
        .unwrap_or_else(|| "00-00-00-00-00-00".to_string());

    let refclks = make_ts_refclks(clock, ptp_domain, &local_mac);
    sdp::set_media_ts_refclks(&mut transport_file, &refclks);

    transport_file.origin.session_version = ntp_seconds;

    Ok(Some(transport_file.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_make_ts_refclks_ptp_with_gmid() {
        let clock = json!({
            "name": "clk0", "ref_type": "ptp", "traceable": true,
            "gmid": "ac-de-48-23-45-67-01-9f", "locked": true,
        });
        let refclks = make_ts_refclks(&clock, 42, "ca-fe-01-ca-fe-02");
        assert_eq!(refclks.len(), 2);
        assert_eq!(
            refclks[0].to_string(),
            "ptp=IEEE1588-2008:ac-de-48-23-45-67-01-9f:42"
        );
        assert_eq!(refclks[1].to_string(), "ptp=IEEE1588-2008:traceable");
    }

    #[test]
    fn test_make_ts_refclks_traceable_only() {
        let clock = json!({
            "name": "clk0", "ref_type": "ptp", "traceable": true,
            "gmid": "ff-ff-ff-ff-ff-ff-ff-ff", "locked": true,
        });
        let refclks = make_ts_refclks(&clock, 0, "ca-fe-01-ca-fe-02");
        assert_eq!(refclks, vec![TsRefclk::PtpTraceable {
            version: "IEEE1588-2008".to_string()
        }]);
    }

    #[test]
    fn test_make_ts_refclks_internal() {
        let clock = json!({ "name": "clk0", "ref_type": "internal" });
        let refclks = make_ts_refclks(&clock, 0, "ca-fe-01-ca-fe-02");
        assert_eq!(refclks, vec![TsRefclk::LocalMac {
            mac: "CA-FE-01-CA-FE-02".to_string()
        }]);
    }
}
