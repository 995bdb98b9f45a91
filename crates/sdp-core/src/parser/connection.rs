//! SDP connection (`c=`) line parsing

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::space1;
use nom::sequence::tuple;
use nom::IResult;

use crate::error::{Error, Result};
use crate::types::Connection;

fn connection_fields(input: &str) -> IResult<&str, (&str, &str, &str)> {
    let (input, (net_type, _, addr_type, _, addr)) = tuple((
        tag("IN"),
        space1,
        alt((tag("IP4"), tag("IP6"))),
        space1,
        take_till1(|c: char| c.is_whitespace()),
    ))(input)?;
    Ok((input, (net_type, addr_type, addr)))
}

/// Parses a connection value: `IN IP4 <address>[/<ttl>[/<count>]]`.
///
/// The optional address count suffix used for layered encodings is not
/// supported; none of the ST 2110 payloads use it.
pub fn parse_connection_line(value: &str) -> Result<Connection> {
    let (remainder, (net_type, addr_type, addr)) = connection_fields(value.trim())
        .map_err(|_| Error::ParsingError(format!("invalid c= line: {}", value)))?;
    if !remainder.trim().is_empty() {
        return Err(Error::ParsingError(format!(
            "invalid c= line (extra content): {}",
            value
        )));
    }

    let (address, ttl) = match addr.split_once('/') {
        Some((address, ttl)) => (address, Some(ttl.parse::<u8>()?)),
        None => (addr, None),
    };

    Ok(Connection {
        net_type: net_type.to_string(),
        addr_type: addr_type.to_string(),
        address: address.to_string(),
        ttl,
    })
}
