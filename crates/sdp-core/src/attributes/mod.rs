//! Typed views over SDP attributes
//!
//! Attribute values are kept as raw strings in the session model (so that
//! re-emission is faithful) and parsed on demand through the functions in
//! these modules.

pub mod fmtp;
pub mod group;
pub mod rtpmap;
pub mod source_filter;
pub mod ts_refclk;

pub use fmtp::{parse_fmtp, Fmtp};
pub use group::{parse_group, Group};
pub use rtpmap::{parse_rtpmap, Rtpmap};
pub use source_filter::{parse_source_filter, FilterMode, SourceFilter};
pub use ts_refclk::{parse_ts_refclk, TsRefclk};

/// Names of the standard attributes this crate interprets.
pub mod names {
    pub const RTPMAP: &str = "rtpmap";
    pub const FMTP: &str = "fmtp";
    pub const SOURCE_FILTER: &str = "source-filter";
    pub const TS_REFCLK: &str = "ts-refclk";
    pub const MEDIACLK: &str = "mediaclk";
    pub const INACTIVE: &str = "inactive";
    pub const GROUP: &str = "group";
    pub const MID: &str = "mid";
    pub const PTIME: &str = "ptime";
    pub const MAXPTIME: &str = "maxptime";
}

/// Names of the custom attributes carried in 'internal' SDP data.
///
/// These configure the node model and are stripped from the SDP published
/// at a sender's `/transportfile` endpoint.
pub mod custom {
    /// Session-level; the host's unique identifier for the sender or receiver.
    pub const INTERNAL_ID: &str = "x-nvnmos-id";
    /// Session-level; optional natural-grouping hint tag.
    pub const GROUP_HINT: &str = "x-nvnmos-group-hint";
    /// Media-level; the interface IP address the stream is sent from or
    /// received on.
    pub const IFACE_IP: &str = "x-nvnmos-iface-ip";
    /// Media-level, senders only; the source port the stream is sent from.
    pub const SRC_PORT: &str = "x-nvnmos-src-port";
    /// fmtp parameter; the codec bit rate in kbit/s.
    pub const FORMAT_BIT_RATE: &str = "x-nvnmos-format-bit-rate";
    /// fmtp parameter; the payload bit rate including transport overhead.
    pub const TRANSPORT_BIT_RATE: &str = "x-nvnmos-transport-bit-rate";
    /// Prefix shared by all custom attributes and fmtp parameters.
    pub const PREFIX: &str = "x-nvnmos-";
}
