//! Node clock maintenance
//!
//! The node manages a single clock, `clk0`. A sender SDP carrying PTP
//! `ts-refclk` attributes upgrades it to a PTP clock; when no sender
//! references PTP any more it reverts to an internal clock.

use serde_json::Value;
use uuid::Uuid;

use rnmos_sdp_core::attributes::TsRefclk;

use crate::error::{Error, Result};
use crate::resources::build::{make_internal_clock, make_ptp_clock};
use crate::resources::ResourceKind;
use crate::store::ResourceStore;

/// The single clock the node manages.
pub const CLOCK_NAME: &str = "clk0";

/// The grandmaster identifier published for a traceable-only reference.
const TRACEABLE_GMID: &str = "ff-ff-ff-ff-ff-ff-ff-ff";

/// Build the node clock matching the given per-leg `ts-refclk` lists, and
/// update the PTP domain in place when one is carried.
///
/// All legs are assumed to share a clock reference, so only the first leg
/// is inspected. RFC 7273 lets one attribute say the clock is traceable or
/// name the grandmaster, not both; ST 2110 senders carry both forms as
/// separate attributes, so a leg is scanned for each.
pub fn make_node_clock(
    clock_name: &str,
    ts_refclks: &[Vec<TsRefclk>],
    ptp_domain: &mut i64,
) -> Value {
    let Some(first_leg) = ts_refclks.first() else {
        return make_internal_clock(clock_name);
    };

    let gmid_refclk = first_leg.iter().find_map(|refclk| match refclk {
        TsRefclk::Ptp {
            version,
            gmid,
            domain,
        } if version.as_str() == "IEEE1588-2008" => Some((gmid, domain)),
        _ => None,
    });
    let traceable = first_leg.iter().any(TsRefclk::is_ptp_traceable);

    match gmid_refclk {
        Some((gmid, domain)) => {
            if let Some(domain) = domain {
                *ptp_domain = *domain as i64;
            }
            make_ptp_clock(clock_name, traceable, &gmid.to_lowercase(), true)
        }
        None if traceable => make_ptp_clock(clock_name, true, TRACEABLE_GMID, true),
        None => make_internal_clock(clock_name),
    }
}

/// Modify the node resource if necessary to update the named clock, which
/// must already exist.
pub fn update_node_clock(
    node_resources: &mut ResourceStore,
    node_id: &Uuid,
    clock: Value,
) -> Result<()> {
    let name = clock["name"]
        .as_str()
        .ok_or_else(|| Error::Internal("clock has no name".to_string()))?
        .to_string();
    let node = node_resources
        .find(node_id, ResourceKind::Node)
        .ok_or_else(|| Error::Internal("node resource is missing".to_string()))?;
    let current = node.data["clocks"]
        .as_array()
        .and_then(|clocks| clocks.iter().find(|c| c["name"] == name.as_str()))
        .ok_or_else(|| Error::Internal(format!("node has no clock named {}", name)))?;

    if *current == clock {
        return Ok(());
    }
    node_resources.modify(node_id, |node| {
        if let Some(clocks) = node.data["clocks"].as_array_mut() {
            if let Some(entry) = clocks.iter_mut().find(|c| c["name"] == name.as_str()) {
                *entry = clock;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rnmos_sdp_core::attributes::parse_ts_refclk;

    fn refclks(values: &[&str]) -> Vec<Vec<TsRefclk>> {
        vec![values
            .iter()
            .map(|v| parse_ts_refclk(v).unwrap())
            .collect()]
    }

    #[test]
    fn test_no_refclks_is_internal() {
        let mut domain = 0;
        let clock = make_node_clock(CLOCK_NAME, &[], &mut domain);
        assert_eq!(clock["ref_type"], "internal");
    }

    #[test]
    fn test_ptp_with_gmid_and_domain() {
        let mut domain = 0;
        let clock = make_node_clock(
            CLOCK_NAME,
            &refclks(&[
                "ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42",
                "ptp=IEEE1588-2008:traceable",
            ]),
            &mut domain,
        );
        assert_eq!(clock["ref_type"], "ptp");
        assert_eq!(clock["gmid"], "ac-de-48-23-45-67-01-9f");
        assert_eq!(clock["traceable"], true);
        assert_eq!(domain, 42);
    }

    #[test]
    fn test_ptp_gmid_without_traceable() {
        let mut domain = 7;
        let clock = make_node_clock(
            CLOCK_NAME,
            &refclks(&["ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F"]),
            &mut domain,
        );
        assert_eq!(clock["traceable"], false);
        // domain carried over when the attribute has none
        assert_eq!(domain, 7);
    }

    #[test]
    fn test_traceable_only() {
        let mut domain = 0;
        let clock = make_node_clock(
            CLOCK_NAME,
            &refclks(&["ptp=IEEE1588-2008:traceable"]),
            &mut domain,
        );
        assert_eq!(clock["ref_type"], "ptp");
        assert_eq!(clock["gmid"], "ff-ff-ff-ff-ff-ff-ff-ff");
        assert_eq!(clock["traceable"], true);
    }

    #[test]
    fn test_localmac_is_internal() {
        let mut domain = 0;
        let clock = make_node_clock(
            CLOCK_NAME,
            &refclks(&["localmac=CA-FE-01-CA-FE-02"]),
            &mut domain,
        );
        assert_eq!(clock["ref_type"], "internal");
    }
}
