//! Format and transport bit rate derivation
//!
//! BCP-006-01 wants both the codec bit rate and the payload bit rate
//! including transport overhead. Either can be carried explicitly in the
//! custom `x-nvnmos-format-bit-rate` / `x-nvnmos-transport-bit-rate` fmtp
//! parameters; otherwise an approximate value is derived from the other,
//! or from the `b=AS:` bandwidth line. All rates are in kbit/s.

use crate::attributes::{custom, Fmtp};
use crate::types::{Bandwidth, BANDWIDTH_APPLICATION_SPECIFIC};

/// Approximate IP/UDP/RTP overhead.
pub const TRANSPORT_BIT_RATE_FACTOR: f64 = 1.05;

fn application_specific(bandwidths: &[Bandwidth]) -> Option<u64> {
    bandwidths
        .iter()
        .find(|b| b.bw_type == BANDWIDTH_APPLICATION_SPECIFIC)
        .map(|b| b.value)
}

fn parameter_value(fmtp: Option<&Fmtp>, name: &str) -> Option<u64> {
    fmtp.and_then(|f| f.parameter(name))
        .and_then(|value| value.trim().parse().ok())
}

/// The codec bit rate, from the custom parameter if present, otherwise
/// approximated from the transport bit rate or the bandwidth line.
pub fn format_bit_rate(fmtp: Option<&Fmtp>, bandwidths: &[Bandwidth]) -> Option<u64> {
    if let Some(rate) = parameter_value(fmtp, custom::FORMAT_BIT_RATE) {
        return Some(rate);
    }
    if let Some(rate) = parameter_value(fmtp, custom::TRANSPORT_BIT_RATE) {
        return Some((rate as f64 / TRANSPORT_BIT_RATE_FACTOR) as u64);
    }
    application_specific(bandwidths).map(|rate| (rate as f64 / TRANSPORT_BIT_RATE_FACTOR) as u64)
}

/// The payload bit rate including transport overhead, from the custom
/// parameter if present, otherwise approximated from the format bit rate
/// (rounded to the nearest Mbit/s, per the examples in VSF TR-08) or taken
/// from the bandwidth line.
pub fn transport_bit_rate(fmtp: Option<&Fmtp>, bandwidths: &[Bandwidth]) -> Option<u64> {
    if let Some(rate) = parameter_value(fmtp, custom::TRANSPORT_BIT_RATE) {
        return Some(rate);
    }
    if let Some(rate) = parameter_value(fmtp, custom::FORMAT_BIT_RATE) {
        return Some(((rate as f64 * TRANSPORT_BIT_RATE_FACTOR / 1e3) + 0.5) as u64 * 1000);
    }
    application_specific(bandwidths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::parse_fmtp;

    fn fmtp(params: &str) -> Fmtp {
        parse_fmtp(&format!("96 {}", params)).unwrap()
    }

    fn bandwidth(value: u64) -> Vec<Bandwidth> {
        vec![Bandwidth {
            bw_type: "AS".to_string(),
            value,
        }]
    }

    #[test]
    fn test_explicit_format_bit_rate() {
        let fmtp = fmtp("x-nvnmos-format-bit-rate=497664");
        assert_eq!(format_bit_rate(Some(&fmtp), &[]), Some(497664));
    }

    #[test]
    fn test_format_bit_rate_from_transport() {
        let fmtp = fmtp("x-nvnmos-transport-bit-rate=522548");
        // 522548 / 1.05
        assert_eq!(format_bit_rate(Some(&fmtp), &[]), Some(497664));
    }

    #[test]
    fn test_format_bit_rate_from_bandwidth() {
        assert_eq!(format_bit_rate(None, &bandwidth(1050)), Some(1000));
    }

    #[test]
    fn test_explicit_transport_bit_rate() {
        let fmtp = fmtp("x-nvnmos-transport-bit-rate=522548");
        assert_eq!(transport_bit_rate(Some(&fmtp), &[]), Some(522548));
    }

    #[test]
    fn test_transport_bit_rate_rounded_to_megabit() {
        let fmtp = fmtp("x-nvnmos-format-bit-rate=497664");
        // 497664 * 1.05 = 522547.2 -> rounds to 523 Mbit/s
        assert_eq!(transport_bit_rate(Some(&fmtp), &[]), Some(523000));
    }

    #[test]
    fn test_transport_bit_rate_from_bandwidth() {
        assert_eq!(transport_bit_rate(None, &bandwidth(1000)), Some(1000));
    }

    #[test]
    fn test_no_sources() {
        assert_eq!(format_bit_rate(None, &[]), None);
        assert_eq!(transport_bit_rate(None, &[]), None);
    }
}
