//! SDP text parsing
//!
//! Each SDP line has the form `<type>=<value>` where the type is a single
//! character. The top-level parser walks the lines, filling in the
//! session-level fields until the first `m=` line and per-media fields
//! after it.

mod connection;
mod media;
mod origin;

pub use connection::parse_connection_line;
pub use media::parse_media_line;
pub use origin::parse_origin_line;

use nom::character::complete::{anychar, char, not_line_ending};
use nom::IResult;

use crate::error::{Error, Result};
use crate::types::{Attribute, Bandwidth, SessionDescription, Timing};

/// Parse a single SDP line into its type character and value.
///
/// Handles CRLF and LF line endings; the value is not trimmed so that
/// attribute values keep embedded whitespace.
pub fn parse_sdp_line(input: &str) -> IResult<&str, (char, &str)> {
    let (input, key) = anychar(input)?;
    let (input, _) = char('=')(input)?;
    let (input, value) = not_line_ending(input)?;
    let input = input.trim_start_matches(['\r', '\n']);
    Ok((input, (key, value)))
}

/// Parse an `a=` attribute value into name and optional value.
pub fn parse_attribute(value: &str) -> Attribute {
    match value.split_once(':') {
        Some((name, value)) => Attribute::value(name, value),
        None => Attribute::flag(value),
    }
}

/// Parse a `b=` bandwidth value, e.g. `AS:1000`.
pub fn parse_bandwidth(value: &str) -> Result<Bandwidth> {
    let (bw_type, bw_value) = value
        .split_once(':')
        .ok_or_else(|| Error::ParsingError(format!("invalid b= line: {}", value)))?;
    Ok(Bandwidth {
        bw_type: bw_type.to_string(),
        value: bw_value.trim().parse()?,
    })
}

/// Parse a `t=` timing value, e.g. `0 0`.
pub fn parse_timing(value: &str) -> Result<Timing> {
    let mut parts = value.split_whitespace();
    let start = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid t= line: {}", value)))?
        .parse()?;
    let stop = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid t= line: {}", value)))?
        .parse()?;
    Ok(Timing { start, stop })
}

/// Parse a complete SDP session description.
pub fn parse_session_description(input: &str) -> Result<SessionDescription> {
    let mut version = None;
    let mut origin = None;
    let mut session_name = None;
    let mut information = None;
    let mut connection = None;
    let mut bandwidths = Vec::new();
    let mut timings = Vec::new();
    let mut attributes = Vec::new();
    let mut media = Vec::new();

    let mut remaining = input;
    while !remaining.is_empty() {
        if remaining.trim().is_empty() {
            break;
        }
        let (rest, (key, value)) = parse_sdp_line(remaining)
            .map_err(|_| Error::InvalidLine(first_line(remaining).to_string()))?;
        remaining = rest;

        if key == 'm' {
            media.push(parse_media_line(value)?);
        } else if let Some(current) = media.last_mut() {
            // media-level lines
            match key {
                'i' => current.information = Some(value.to_string()),
                'c' => current.connection = Some(parse_connection_line(value)?),
                'b' => current.bandwidths.push(parse_bandwidth(value)?),
                'a' => current.attributes.push(parse_attribute(value)),
                // k= (encryption) and other media-level types are not used
                // by any supported payload
                _ => {
                    return Err(Error::InvalidLine(format!("{}={}", key, value)));
                }
            }
        } else {
            // session-level lines
            match key {
                'v' => version = Some(value.trim().parse::<u8>()?),
                'o' => origin = Some(parse_origin_line(value)?),
                's' => session_name = Some(value.to_string()),
                'i' => information = Some(value.to_string()),
                'c' => connection = Some(parse_connection_line(value)?),
                'b' => bandwidths.push(parse_bandwidth(value)?),
                't' => timings.push(parse_timing(value)?),
                'a' => attributes.push(parse_attribute(value)),
                // u=, e=, p=, r=, z=, k= are legal but unused; keep the
                // parser strict about unknown types
                'u' | 'e' | 'p' | 'r' | 'z' | 'k' => {}
                _ => {
                    return Err(Error::InvalidLine(format!("{}={}", key, value)));
                }
            }
        }
    }

    let session = SessionDescription {
        version: version.ok_or(Error::MissingField("v"))?,
        origin: origin.ok_or(Error::MissingField("o"))?,
        session_name: session_name.ok_or(Error::MissingField("s"))?,
        information,
        connection,
        bandwidths,
        timings,
        attributes,
        media,
    };
    if session.timings.is_empty() {
        return Err(Error::MissingField("t"));
    }
    Ok(session)
}

fn first_line(input: &str) -> &str {
    input.lines().next().unwrap_or(input)
}
