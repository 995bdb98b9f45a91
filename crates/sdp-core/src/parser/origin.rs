//! SDP origin (`o=`) line parsing

use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{digit1, space1};
use nom::branch::alt;
use nom::sequence::tuple;
use nom::IResult;

use crate::error::{Error, Result};
use crate::types::Origin;

fn origin_fields(input: &str) -> IResult<&str, (&str, &str, &str, &str, &str, &str)> {
    let (input, (username, _, session_id, _, session_version, _, net_type, _, addr_type, _, addr)) =
        tuple((
            take_till1(|c| c == ' '),
            space1,
            digit1,
            space1,
            digit1,
            space1,
            tag("IN"),
            space1,
            alt((tag("IP4"), tag("IP6"))),
            space1,
            take_till1(|c: char| c.is_whitespace()),
        ))(input)?;
    Ok((
        input,
        (username, session_id, session_version, net_type, addr_type, addr),
    ))
}

/// Parses an origin value:
/// `<username> <sess-id> <sess-version> <nettype> <addrtype> <unicast-address>`
pub fn parse_origin_line(value: &str) -> Result<Origin> {
    let (remainder, (username, session_id, session_version, net_type, addr_type, addr)) =
        origin_fields(value.trim())
            .map_err(|_| Error::ParsingError(format!("invalid o= line: {}", value)))?;
    if !remainder.trim().is_empty() {
        return Err(Error::ParsingError(format!(
            "invalid o= line (extra content): {}",
            value
        )));
    }
    Ok(Origin {
        username: username.to_string(),
        session_id: session_id.parse()?,
        session_version: session_version.parse()?,
        net_type: net_type.to_string(),
        addr_type: addr_type.to_string(),
        unicast_address: addr.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_origin() {
        let origin = parse_origin_line("- 1697705406 1697705406 IN IP4 192.0.2.10").unwrap();
        assert_eq!(origin.username, "-");
        assert_eq!(origin.session_id, 1697705406);
        assert_eq!(origin.session_version, 1697705406);
        assert_eq!(origin.net_type, "IN");
        assert_eq!(origin.addr_type, "IP4");
        assert_eq!(origin.unicast_address, "192.0.2.10");
    }

    #[test]
    fn test_parse_origin_ip6() {
        let origin = parse_origin_line("jdoe 1 2 IN IP6 2001:db8::1").unwrap();
        assert_eq!(origin.addr_type, "IP6");
        assert_eq!(origin.unicast_address, "2001:db8::1");
    }

    #[test]
    fn test_parse_origin_invalid() {
        // too few fields
        assert!(parse_origin_line("- 1 2 IN IP4").is_err());
        // non-numeric session id
        assert!(parse_origin_line("- abc 2 IN IP4 192.0.2.10").is_err());
        // unknown network type
        assert!(parse_origin_line("- 1 2 ATM IP4 192.0.2.10").is_err());
        // trailing fields
        assert!(parse_origin_line("- 1 2 IN IP4 192.0.2.10 extra").is_err());
    }

    #[test]
    fn test_origin_round_trip() {
        let text = "- 1697705406 1697705407 IN IP4 192.0.2.10";
        assert_eq!(parse_origin_line(text).unwrap().to_string(), text);
    }
}
