//! Typed SDP session model
//!
//! The structures here hold everything needed to reconstruct the SDP text
//! they were parsed from: field values and the exact order of attributes.
//! `Display` renders the canonical CRLF form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A rational number, used for frame rates and sample rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: u64,
    pub denominator: u64,
}

impl Rational {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl From<u64> for Rational {
    fn from(numerator: u64) -> Self {
        Self::new(numerator, 1)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Rational {
    type Err = Error;

    /// Parses `"50"` or `"60000/1001"`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((num, den)) => Ok(Self::new(num.trim().parse()?, den.trim().parse()?)),
            None => Ok(Self::new(s.trim().parse()?, 1)),
        }
    }
}

/// The `o=` origin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub net_type: String,
    pub addr_type: String,
    pub unicast_address: String,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.username,
            self.session_id,
            self.session_version,
            self.net_type,
            self.addr_type,
            self.unicast_address
        )
    }
}

/// A `c=` connection line.
///
/// The TTL suffix (`233.252.0.0/64`) is kept separately so the address can
/// be swapped without disturbing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub net_type: String,
    pub addr_type: String,
    pub address: String,
    pub ttl: Option<u8>,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.net_type, self.addr_type, self.address)?;
        if let Some(ttl) = self.ttl {
            write!(f, "/{}", ttl)?;
        }
        Ok(())
    }
}

/// A `b=` bandwidth line, e.g. `b=AS:1000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bandwidth {
    pub bw_type: String,
    pub value: u64,
}

/// Application-specific bandwidth type token.
pub const BANDWIDTH_APPLICATION_SPECIFIC: &str = "AS";

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bw_type, self.value)
    }
}

/// A `t=` timing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub start: u64,
    pub stop: u64,
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.stop)
    }
}

/// An `a=` attribute: a bare flag (`a=inactive`) or a named value
/// (`a=ptime:1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:{}", self.name, value),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An `m=` media description with its subordinate lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    /// Media kind token from the `m=` line, e.g. `video` or `audio`.
    pub media: String,
    pub port: u16,
    pub port_count: Option<u32>,
    pub protocol: String,
    /// Payload format tokens from the `m=` line.
    pub formats: Vec<String>,
    pub information: Option<String>,
    pub connection: Option<Connection>,
    pub bandwidths: Vec<Bandwidth>,
    pub attributes: Vec<Attribute>,
}

impl MediaDescription {
    /// First attribute with the given name, if any.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Value of the first attribute with the given name.
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|a| a.value.as_deref())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Removes every attribute with the given name.
    pub fn remove_attributes(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }
}

impl fmt::Display for MediaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} {}", self.media, self.port)?;
        if let Some(count) = self.port_count {
            write!(f, "/{}", count)?;
        }
        write!(f, " {}", self.protocol)?;
        for format in &self.formats {
            write!(f, " {}", format)?;
        }
        write!(f, "\r\n")?;
        if let Some(information) = &self.information {
            write!(f, "i={}\r\n", information)?;
        }
        if let Some(connection) = &self.connection {
            write!(f, "c={}\r\n", connection)?;
        }
        for bandwidth in &self.bandwidths {
            write!(f, "b={}\r\n", bandwidth)?;
        }
        for attribute in &self.attributes {
            write!(f, "a={}\r\n", attribute)?;
        }
        Ok(())
    }
}

/// A complete SDP session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub version: u8,
    pub origin: Origin,
    pub session_name: String,
    /// The optional `i=` session information line.
    pub information: Option<String>,
    pub connection: Option<Connection>,
    pub bandwidths: Vec<Bandwidth>,
    pub timings: Vec<Timing>,
    pub attributes: Vec<Attribute>,
    pub media: Vec<MediaDescription>,
}

impl SessionDescription {
    /// First session-level attribute with the given name, if any.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Value of the first session-level attribute with the given name.
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|a| a.value.as_deref())
    }

    /// Removes every session-level attribute with the given name.
    pub fn remove_attributes(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }

    /// The effective connection for a media description: the media-level
    /// `c=` line if present, otherwise the session-level one.
    pub fn connection_for(&self, leg: usize) -> Option<&Connection> {
        self.media
            .get(leg)
            .and_then(|m| m.connection.as_ref())
            .or(self.connection.as_ref())
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v={}\r\n", self.version)?;
        write!(f, "o={}\r\n", self.origin)?;
        write!(f, "s={}\r\n", self.session_name)?;
        if let Some(information) = &self.information {
            write!(f, "i={}\r\n", information)?;
        }
        if let Some(connection) = &self.connection {
            write!(f, "c={}\r\n", connection)?;
        }
        for bandwidth in &self.bandwidths {
            write!(f, "b={}\r\n", bandwidth)?;
        }
        for timing in &self.timings {
            write!(f, "t={}\r\n", timing)?;
        }
        for attribute in &self.attributes {
            write!(f, "a={}\r\n", attribute)?;
        }
        for media in &self.media {
            write!(f, "{}", media)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_from_str() {
        assert_eq!("50".parse::<Rational>().unwrap(), Rational::new(50, 1));
        assert_eq!(
            "60000/1001".parse::<Rational>().unwrap(),
            Rational::new(60000, 1001)
        );
        assert!("abc".parse::<Rational>().is_err());
    }

    #[test]
    fn test_rational_display() {
        assert_eq!(Rational::new(50, 1).to_string(), "50");
        assert_eq!(Rational::new(60000, 1001).to_string(), "60000/1001");
    }

    #[test]
    fn test_connection_display_keeps_ttl() {
        let connection = Connection {
            net_type: "IN".to_string(),
            addr_type: "IP4".to_string(),
            address: "233.252.0.0".to_string(),
            ttl: Some(64),
        };
        assert_eq!(connection.to_string(), "IN IP4 233.252.0.0/64");
    }

    #[test]
    fn test_attribute_display() {
        assert_eq!(Attribute::flag("inactive").to_string(), "inactive");
        assert_eq!(
            Attribute::value("ptime", "1").to_string(),
            "ptime:1"
        );
    }
}
