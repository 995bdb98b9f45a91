//! `ts-refclk` attribute parsing (RFC 7273)
//!
//! The forms relevant to ST 2110 are:
//!
//! - `a=ts-refclk:ptp=<ptp version>:<ptp gmid>[:<ptp domain>]`
//! - `a=ts-refclk:ptp=<ptp version>:traceable`
//! - `a=ts-refclk:localmac=<mac address>`
//!
//! RFC 7273 allows either knowing the grandmaster identity or knowing the
//! clock is traceable, not both in one attribute; ST 2110 senders commonly
//! carry both forms as separate attributes.

use std::fmt;

use crate::error::{Error, Result};

/// PTP version token for IEEE 1588-2008, the version required by ST 2110.
pub const PTP_VERSION_IEEE1588_2008: &str = "IEEE1588-2008";

/// A parsed `ts-refclk` clock reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsRefclk {
    /// A PTP reference with a known grandmaster.
    Ptp {
        version: String,
        gmid: String,
        domain: Option<u32>,
    },
    /// A PTP reference known only to be traceable.
    PtpTraceable { version: String },
    /// A local MAC address reference (no external clock).
    LocalMac { mac: String },
}

impl TsRefclk {
    /// Whether this is an IEEE 1588-2008 reference with a known grandmaster.
    pub fn is_ptp_with_gmid(&self) -> bool {
        matches!(self, TsRefclk::Ptp { version, .. } if version == PTP_VERSION_IEEE1588_2008)
    }

    /// Whether this is an IEEE 1588-2008 traceable reference.
    pub fn is_ptp_traceable(&self) -> bool {
        matches!(self, TsRefclk::PtpTraceable { version } if version == PTP_VERSION_IEEE1588_2008)
    }
}

impl fmt::Display for TsRefclk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TsRefclk::Ptp {
                version,
                gmid,
                domain,
            } => {
                write!(f, "ptp={}:{}", version, gmid)?;
                if let Some(domain) = domain {
                    write!(f, ":{}", domain)?;
                }
                Ok(())
            }
            TsRefclk::PtpTraceable { version } => write!(f, "ptp={}:traceable", version),
            TsRefclk::LocalMac { mac } => write!(f, "localmac={}", mac),
        }
    }
}

/// Parses a `ts-refclk` attribute value.
pub fn parse_ts_refclk(value: &str) -> Result<TsRefclk> {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix("ptp=") {
        let (version, server) = rest
            .split_once(':')
            .ok_or_else(|| Error::ParsingError(format!("invalid ts-refclk: {}", value)))?;
        if server == "traceable" {
            return Ok(TsRefclk::PtpTraceable {
                version: version.to_string(),
            });
        }
        // <gmid>[:<domain>] - the gmid itself contains no colons
        let (gmid, domain) = match server.split_once(':') {
            Some((gmid, domain)) => (gmid, Some(domain.parse::<u32>()?)),
            None => (server, None),
        };
        Ok(TsRefclk::Ptp {
            version: version.to_string(),
            gmid: gmid.to_string(),
            domain,
        })
    } else if let Some(mac) = value.strip_prefix("localmac=") {
        Ok(TsRefclk::LocalMac {
            mac: mac.to_string(),
        })
    } else {
        Err(Error::ParsingError(format!(
            "unsupported ts-refclk source: {}",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ptp_with_domain() {
        let refclk =
            parse_ts_refclk("ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42").unwrap();
        assert_eq!(
            refclk,
            TsRefclk::Ptp {
                version: "IEEE1588-2008".to_string(),
                gmid: "AC-DE-48-23-45-67-01-9F".to_string(),
                domain: Some(42),
            }
        );
        assert!(refclk.is_ptp_with_gmid());
    }

    #[test]
    fn test_parse_ptp_without_domain() {
        let refclk = parse_ts_refclk("ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F").unwrap();
        assert_eq!(
            refclk,
            TsRefclk::Ptp {
                version: "IEEE1588-2008".to_string(),
                gmid: "AC-DE-48-23-45-67-01-9F".to_string(),
                domain: None,
            }
        );
    }

    #[test]
    fn test_parse_traceable() {
        let refclk = parse_ts_refclk("ptp=IEEE1588-2008:traceable").unwrap();
        assert!(refclk.is_ptp_traceable());
        assert!(!refclk.is_ptp_with_gmid());
    }

    #[test]
    fn test_parse_localmac() {
        let refclk = parse_ts_refclk("localmac=CA-FE-01-CA-FE-02").unwrap();
        assert_eq!(
            refclk,
            TsRefclk::LocalMac {
                mac: "CA-FE-01-CA-FE-02".to_string()
            }
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_ts_refclk("ntp=/traceable/").is_err());
        assert!(parse_ts_refclk("ptp=IEEE1588-2008").is_err());
        assert!(parse_ts_refclk("").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F:42",
            "ptp=IEEE1588-2008:AC-DE-48-23-45-67-01-9F",
            "ptp=IEEE1588-2008:traceable",
            "localmac=CA-FE-01-CA-FE-02",
        ] {
            assert_eq!(parse_ts_refclk(text).unwrap().to_string(), text);
        }
    }
}
