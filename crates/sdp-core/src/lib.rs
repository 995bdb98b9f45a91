//! # rnmos-sdp-core
//!
//! Session Description Protocol support for the rnmos NMOS node stack.
//!
//! This crate provides the SDP model used to configure NMOS senders and
//! receivers: parsing of SDP text into a typed [`SessionDescription`],
//! serialization back to text, and the typed views the node model needs on
//! top of it:
//!
//! - per-leg RTP transport parameters for senders and receivers,
//!   including the custom `x-nvnmos-*` attributes carried in 'internal'
//!   SDP data ([`transport`])
//! - media format identification and format-specific parameters for the
//!   supported ST 2110 / ST 2022-6 payloads ([`format`], [`params`])
//! - `ts-refclk` clock references ([`attributes::ts_refclk`])
//! - format and transport bit rate derivation ([`bit_rate`])
//!
//! Parsing accepts CRLF or LF line endings and preserves attribute order,
//! so that an SDP parsed and re-emitted through [`SessionDescription`] is
//! reproduced byte-for-byte apart from deliberate edits.

pub mod attributes;
pub mod bit_rate;
pub mod error;
pub mod format;
pub mod params;
pub mod parser;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use format::{MediaKind, MediaType};
pub use parser::parse_session_description;
pub use types::{
    Attribute, Bandwidth, Connection, MediaDescription, Origin, Rational, SessionDescription,
    Timing,
};
pub use transport::{
    group_hint, internal_id, make_internal_session_description,
    make_transport_file_session_description, receiver_transport_params, sender_transport_params,
    session_info, set_media_ts_refclks, strip_custom_attributes, ts_refclks, EndpointKind,
    ReceiverTransportParams, SenderTransportParams, SourcePort, TransportParams,
};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
///
/// SDP origin session IDs and versions are conventionally NTP timestamps.
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;
