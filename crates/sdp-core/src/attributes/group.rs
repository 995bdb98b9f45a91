//! `group` attribute parsing (RFC 5888), used with `DUP` semantics for
//! ST 2022-7 dual-legged streams.

use std::fmt;

use crate::error::{Error, Result};

/// `a=group:DUP` semantics token.
pub const SEMANTICS_DUPLICATION: &str = "DUP";

/// A parsed `group` attribute, e.g. `DUP 0 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub semantics: String,
    pub mids: Vec<String>,
}

impl Group {
    pub fn duplication(mids: Vec<String>) -> Self {
        Self {
            semantics: SEMANTICS_DUPLICATION.to_string(),
            mids,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.semantics)?;
        for mid in &self.mids {
            write!(f, " {}", mid)?;
        }
        Ok(())
    }
}

/// Parses a `group` attribute value.
pub fn parse_group(value: &str) -> Result<Group> {
    let mut parts = value.split_whitespace();
    let semantics = parts
        .next()
        .ok_or_else(|| Error::ParsingError(format!("invalid group: {}", value)))?;
    Ok(Group {
        semantics: semantics.to_string(),
        mids: parts.map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dup_group() {
        let group = parse_group("DUP 0 1").unwrap();
        assert_eq!(group.semantics, "DUP");
        assert_eq!(group.mids, vec!["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(parse_group("DUP 0 1").unwrap().to_string(), "DUP 0 1");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_group("").is_err());
    }
}
