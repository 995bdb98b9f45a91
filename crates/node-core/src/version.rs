//! Resource version stamps
//!
//! IS-04 versions are seconds and nanoseconds since the epoch, rendered as
//! `"<seconds>:<nanoseconds>"`. Within a resource, versions must strictly
//! increase with every mutation; the store enforces that by clamping the
//! wall clock to one nanosecond past the most recent stamp it issued.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A resource version (or activation time) stamp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Version {
    pub seconds: u64,
    pub nanoseconds: u32,
}

impl Version {
    pub const fn new(seconds: u64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Self {
            seconds: now.timestamp().max(0) as u64,
            nanoseconds: now.timestamp_subsec_nanos().min(999_999_999),
        }
    }

    /// The smallest version strictly greater than this one.
    pub fn successor(&self) -> Self {
        if self.nanoseconds < 999_999_999 {
            Self::new(self.seconds, self.nanoseconds + 1)
        } else {
            Self::new(self.seconds + 1, 0)
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seconds, self.nanoseconds)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let (seconds, nanoseconds) = s
            .split_once(':')
            .ok_or_else(|| Error::Validation(format!("invalid version stamp: {}", s)))?;
        Ok(Self {
            seconds: seconds
                .parse()
                .map_err(|_| Error::Validation(format!("invalid version stamp: {}", s)))?,
            nanoseconds: nanoseconds
                .parse()
                .map_err(|_| Error::Validation(format!("invalid version stamp: {}", s)))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let version = Version::new(1697705406, 123456789);
        assert_eq!(version.to_string(), "1697705406:123456789");
        assert_eq!("1697705406:123456789".parse::<Version>().unwrap(), version);
        assert!("1697705406".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Version::new(1, 0) < Version::new(1, 1));
        assert!(Version::new(1, 999_999_999) < Version::new(2, 0));
    }

    #[test]
    fn test_successor() {
        assert_eq!(Version::new(1, 5).successor(), Version::new(1, 6));
        assert_eq!(
            Version::new(1, 999_999_999).successor(),
            Version::new(2, 0)
        );
    }
}
