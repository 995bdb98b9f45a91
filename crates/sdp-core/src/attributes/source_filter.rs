//! `source-filter` attribute parsing (RFC 4570)
//!
//! Format: `a=source-filter: <filter-mode> <nettype> <address-types>
//! <dest-address> <src-list>`. Note the space after the colon; the leading
//! whitespace in the attribute value is tolerated on parse and reproduced
//! on emission.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Include => write!(f, "incl"),
            FilterMode::Exclude => write!(f, "excl"),
        }
    }
}

/// A parsed `source-filter` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    pub mode: FilterMode,
    pub net_type: String,
    pub addr_type: String,
    pub dest_address: String,
    pub src_addresses: Vec<String>,
}

impl SourceFilter {
    /// An inclusive IPv4 filter for a single source, the form used by
    /// source-specific multicast senders.
    pub fn include_v4(dest_address: impl Into<String>, src_address: impl Into<String>) -> Self {
        Self {
            mode: FilterMode::Include,
            net_type: "IN".to_string(),
            addr_type: "IP4".to_string(),
            dest_address: dest_address.into(),
            src_addresses: vec![src_address.into()],
        }
    }

    /// Renders the attribute value including the conventional leading space.
    pub fn to_attribute_value(&self) -> String {
        format!(" {}", self)
    }
}

impl fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.mode, self.net_type, self.addr_type, self.dest_address
        )?;
        for src in &self.src_addresses {
            write!(f, " {}", src)?;
        }
        Ok(())
    }
}

/// Parses a `source-filter` attribute value.
pub fn parse_source_filter(value: &str) -> Result<SourceFilter> {
    let mut parts = value.split_whitespace();
    let mode = match parts.next() {
        Some("incl") => FilterMode::Include,
        Some("excl") => FilterMode::Exclude,
        _ => {
            return Err(Error::ParsingError(format!(
                "invalid source-filter mode: {}",
                value
            )))
        }
    };
    let net_type = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid source-filter: {}", value)))?;
    let addr_type = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid source-filter: {}", value)))?;
    let dest_address = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid source-filter: {}", value)))?;
    let src_addresses: Vec<String> = parts.map(str::to_string).collect();
    if src_addresses.is_empty() {
        return Err(Error::ParsingError(format!(
            "source-filter has no source addresses: {}",
            value
        )));
    }
    Ok(SourceFilter {
        mode,
        net_type: net_type.to_string(),
        addr_type: addr_type.to_string(),
        dest_address: dest_address.to_string(),
        src_addresses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inclusive_filter() {
        let filter = parse_source_filter(" incl IN IP4 233.252.0.0 192.0.2.10").unwrap();
        assert_eq!(filter.mode, FilterMode::Include);
        assert_eq!(filter.dest_address, "233.252.0.0");
        assert_eq!(filter.src_addresses, vec!["192.0.2.10".to_string()]);
    }

    #[test]
    fn test_parse_multiple_sources() {
        let filter =
            parse_source_filter("incl IN IP4 233.252.0.0 192.0.2.10 192.0.2.11").unwrap();
        assert_eq!(filter.src_addresses.len(), 2);
    }

    #[test]
    fn test_parse_exclusive_filter() {
        let filter = parse_source_filter("excl IN IP4 233.252.0.0 198.51.100.1").unwrap();
        assert_eq!(filter.mode, FilterMode::Exclude);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_source_filter("only IN IP4 233.252.0.0 192.0.2.10").is_err());
        assert!(parse_source_filter("incl IN IP4 233.252.0.0").is_err());
        assert!(parse_source_filter("").is_err());
    }

    #[test]
    fn test_attribute_value_round_trip() {
        let text = " incl IN IP4 233.252.0.0 192.0.2.10";
        let filter = parse_source_filter(text).unwrap();
        assert_eq!(filter.to_attribute_value(), text);
    }
}
