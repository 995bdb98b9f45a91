//! `fmtp` attribute parsing
//!
//! ST 2110 format-specific parameters are `key=value` pairs separated by
//! semicolons, e.g.
//! `a=fmtp:96 sampling=YCbCr-4:2:2; width=1920; height=1080; ...`.
//! Parameter order is preserved; flag parameters without `=` are kept with
//! an empty value.

use std::fmt;

use crate::error::{Error, Result};

/// A parsed `fmtp` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fmtp {
    /// The payload format the parameters apply to.
    pub format: String,
    pub parameters: Vec<(String, String)>,
}

impl Fmtp {
    /// Value of the named parameter, if present.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Removes every parameter whose key starts with the given prefix.
    pub fn remove_parameters_with_prefix(&mut self, prefix: &str) {
        self.parameters.retain(|(key, _)| !key.starts_with(prefix));
    }
}

impl fmt::Display for Fmtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.format)?;
        let mut first = true;
        for (key, value) in &self.parameters {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            if value.is_empty() {
                write!(f, "{}", key)?;
            } else {
                write!(f, "{}={}", key, value)?;
            }
        }
        Ok(())
    }
}

/// Parses an `fmtp` attribute value.
pub fn parse_fmtp(value: &str) -> Result<Fmtp> {
    let (format, params) = value
        .trim_start()
        .split_once(' ')
        .ok_or_else(|| Error::ParsingError(format!("invalid fmtp: {}", value)))?;

    let mut parameters = Vec::new();
    for part in params.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((key, param_value)) => {
                parameters.push((key.trim().to_string(), param_value.trim().to_string()))
            }
            None => parameters.push((part.to_string(), String::new())),
        }
    }

    Ok(Fmtp {
        format: format.to_string(),
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_fmtp() {
        let fmtp = parse_fmtp(
            "96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; \
             TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN; ",
        )
        .unwrap();
        assert_eq!(fmtp.format, "96");
        assert_eq!(fmtp.parameter("sampling"), Some("YCbCr-4:2:2"));
        assert_eq!(fmtp.parameter("width"), Some("1920"));
        assert_eq!(fmtp.parameter("TP"), Some("2110TPN"));
        assert_eq!(fmtp.parameter("missing"), None);
    }

    #[test]
    fn test_parse_audio_fmtp() {
        let fmtp = parse_fmtp("97 channel-order=SMPTE2110.(ST); ").unwrap();
        assert_eq!(fmtp.parameter("channel-order"), Some("SMPTE2110.(ST)"));
    }

    #[test]
    fn test_parse_ancillary_fmtp() {
        // SMPTE 291 DID/SDID pairs use a flag-free value with braces
        let fmtp = parse_fmtp("100 DID_SDID={0x41,0x01}; VPID_Code=132").unwrap();
        assert_eq!(fmtp.parameter("DID_SDID"), Some("{0x41,0x01}"));
        assert_eq!(fmtp.parameter("VPID_Code"), Some("132"));
    }

    #[test]
    fn test_remove_prefixed_parameters() {
        let mut fmtp = parse_fmtp(
            "96 profile=High444.12; x-nvnmos-format-bit-rate=497664; x-nvnmos-transport-bit-rate=522548",
        )
        .unwrap();
        fmtp.remove_parameters_with_prefix("x-nvnmos-");
        assert_eq!(fmtp.parameters.len(), 1);
        assert_eq!(fmtp.parameter("profile"), Some("High444.12"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_fmtp("96").is_err());
    }

    #[test]
    fn test_display_canonical() {
        let fmtp = parse_fmtp("96 width=1920; height=1080; ").unwrap();
        assert_eq!(fmtp.to_string(), "96 width=1920; height=1080");
    }
}
