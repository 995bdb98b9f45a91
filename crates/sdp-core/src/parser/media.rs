//! SDP media (`m=`) line parsing

use crate::error::{Error, Result};
use crate::types::MediaDescription;

/// Parses a media value: `<media> <port>[/<count>] <proto> <fmt> ...`
pub fn parse_media_line(value: &str) -> Result<MediaDescription> {
    let mut parts = value.split_whitespace();
    let media = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid m= line: {}", value)))?;
    let port_field = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid m= line: {}", value)))?;
    let protocol = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid m= line: {}", value)))?;
    let formats: Vec<String> = parts.map(str::to_string).collect();
    if formats.is_empty() {
        return Err(Error::ParsingError(format!(
            "m= line has no formats: {}",
            value
        )));
    }

    let (port, port_count) = match port_field.split_once('/') {
        Some((port, count)) => (port.parse()?, Some(count.parse()?)),
        None => (port_field.parse()?, None),
    };

    Ok(MediaDescription {
        media: media.to_string(),
        port,
        port_count,
        protocol: protocol.to_string(),
        formats,
        information: None,
        connection: None,
        bandwidths: Vec::new(),
        attributes: Vec::new(),
    })
}
