//! `rtpmap` attribute parsing
//!
//! Format: `a=rtpmap:<payload type> <encoding name>/<clock rate>[/<encoding
//! parameters>]`, e.g. `96 raw/90000` or `97 L24/48000/2`.

use std::fmt;

use nom::bytes::complete::take_till1;
use nom::character::complete::{char, digit1, space1};
use nom::combinator::opt;
use nom::sequence::{preceded, tuple};
use nom::IResult;

use crate::error::{Error, Result};

/// A parsed `rtpmap` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rtpmap {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    /// Channel count for audio encodings.
    pub encoding_params: Option<String>,
}

impl fmt::Display for Rtpmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.payload_type, self.encoding_name, self.clock_rate
        )?;
        if let Some(params) = &self.encoding_params {
            write!(f, "/{}", params)?;
        }
        Ok(())
    }
}

fn rtpmap_fields(input: &str) -> IResult<&str, (&str, &str, &str, Option<&str>)> {
    tuple((
        digit1,
        preceded(space1, take_till1(|c| c == '/')),
        preceded(char('/'), digit1),
        opt(preceded(char('/'), take_till1(|c: char| c.is_whitespace()))),
    ))(input)
}

/// Parses an `rtpmap` attribute value.
pub fn parse_rtpmap(value: &str) -> Result<Rtpmap> {
    let (remainder, (payload_type, encoding_name, clock_rate, encoding_params)) =
        rtpmap_fields(value.trim())
            .map_err(|_| Error::ParsingError(format!("invalid rtpmap: {}", value)))?;
    if !remainder.trim().is_empty() {
        return Err(Error::ParsingError(format!(
            "invalid rtpmap (extra content): {}",
            value
        )));
    }
    let payload_type: u8 = payload_type.parse()?;
    if payload_type > 127 {
        return Err(Error::ParsingError(format!(
            "rtpmap payload type out of range: {}",
            payload_type
        )));
    }
    Ok(Rtpmap {
        payload_type,
        encoding_name: encoding_name.to_string(),
        clock_rate: clock_rate.parse()?,
        encoding_params: encoding_params.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_rtpmap() {
        let rtpmap = parse_rtpmap("96 raw/90000").unwrap();
        assert_eq!(rtpmap.payload_type, 96);
        assert_eq!(rtpmap.encoding_name, "raw");
        assert_eq!(rtpmap.clock_rate, 90000);
        assert!(rtpmap.encoding_params.is_none());
    }

    #[test]
    fn test_parse_audio_rtpmap() {
        let rtpmap = parse_rtpmap("97 L24/48000/2").unwrap();
        assert_eq!(rtpmap.encoding_name, "L24");
        assert_eq!(rtpmap.clock_rate, 48000);
        assert_eq!(rtpmap.encoding_params.as_deref(), Some("2"));
    }

    #[test]
    fn test_parse_smpte2022_6() {
        let rtpmap = parse_rtpmap("98 SMPTE2022-6/27000000").unwrap();
        assert_eq!(rtpmap.encoding_name, "SMPTE2022-6");
        assert_eq!(rtpmap.clock_rate, 27000000);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_rtpmap("96").is_err());
        assert!(parse_rtpmap("96 raw").is_err());
        assert!(parse_rtpmap("200 raw/90000").is_err());
        assert!(parse_rtpmap("abc raw/90000").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["96 raw/90000", "97 L24/48000/2"] {
            assert_eq!(parse_rtpmap(text).unwrap().to_string(), text);
        }
    }
}
