//! The activation wall clock
//!
//! Scheduled activations and SDP origin versions need the current time;
//! the trait keeps it substitutable in tests.

use std::sync::Arc;

use rnmos_node_core::Version;
use rnmos_sdp_core::NTP_UNIX_OFFSET;

/// A source of wall-clock time for activations and SDP emission.
pub trait Clock: Send + Sync {
    /// The current time as an IS-04 version/activation stamp.
    fn tai_now(&self) -> Version;

    /// The current time as NTP seconds (since 1900), used for SDP origin
    /// session versions.
    fn ntp_seconds(&self) -> u64 {
        self.tai_now().seconds + NTP_UNIX_OFFSET
    }
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn tai_now(&self) -> Version {
        Version::now()
    }
}

/// A manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock(pub std::sync::Mutex<Version>);

impl ManualClock {
    pub fn new(at: Version) -> Arc<Self> {
        Arc::new(Self(std::sync::Mutex::new(at)))
    }

    pub fn set(&self, at: Version) {
        *self.0.lock().unwrap() = at;
    }
}

impl Clock for ManualClock {
    fn tai_now(&self) -> Version {
        *self.0.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntp_seconds_offset() {
        let clock = ManualClock::new(Version::new(1_697_705_406, 0));
        assert_eq!(clock.ntp_seconds(), 1_697_705_406 + 2_208_988_800);
    }
}
