//! Format-specific parameter views
//!
//! Typed extraction of the media parameters the node model needs from the
//! `rtpmap`, `fmtp`, `ptime` and `maxptime` attributes of each supported
//! payload.

use crate::attributes::{names, parse_fmtp, parse_rtpmap, Fmtp, Rtpmap};
use crate::error::{Error, Result};
use crate::types::{MediaDescription, Rational};

fn find_rtpmap(media: &MediaDescription) -> Result<Rtpmap> {
    media
        .attribute_value(names::RTPMAP)
        .map(parse_rtpmap)
        .transpose()?
        .ok_or(Error::MissingAttribute(names::RTPMAP))
}

/// The `fmtp` attribute of a media description, if present.
pub fn find_fmtp(media: &MediaDescription) -> Result<Option<Fmtp>> {
    media
        .attribute_value(names::FMTP)
        .map(parse_fmtp)
        .transpose()
}

fn required<'a>(fmtp: &'a Fmtp, name: &str) -> Result<&'a str> {
    fmtp.parameter(name)
        .ok_or_else(|| Error::InvalidFormatParameter(format!("missing {}", name)))
}

/// Parameters of an uncompressed (`video/raw`) flow per ST 2110-20.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRawParams {
    pub sampling: String,
    pub width: u64,
    pub height: u64,
    pub exact_framerate: Rational,
    pub depth: u32,
    pub interlace: bool,
    /// Transfer characteristic system; `SDR` when unspecified.
    pub tcs: String,
    pub colorimetry: String,
    /// ST 2110-21 sender type (`TP=`), when specified.
    pub sender_type: Option<String>,
}

impl VideoRawParams {
    pub fn from_media(media: &MediaDescription) -> Result<Self> {
        let fmtp =
            find_fmtp(media)?.ok_or_else(|| Error::MissingAttribute(names::FMTP))?;
        Ok(Self {
            sampling: required(&fmtp, "sampling")?.to_string(),
            width: required(&fmtp, "width")?.parse()?,
            height: required(&fmtp, "height")?.parse()?,
            exact_framerate: required(&fmtp, "exactframerate")?.parse()?,
            depth: required(&fmtp, "depth")?.parse()?,
            interlace: fmtp.parameter("interlace").is_some(),
            tcs: fmtp.parameter("TCS").unwrap_or("SDR").to_string(),
            colorimetry: required(&fmtp, "colorimetry")?.to_string(),
            sender_type: fmtp.parameter("TP").map(str::to_string),
        })
    }
}

/// ST 2110-22 JPEG XS packetization modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketTransmissionMode {
    Codestream,
    SliceSequential,
    SliceOutOfOrder,
}

impl PacketTransmissionMode {
    /// Derive the mode from the `packetmode` (K) and `transmode` (T)
    /// format parameters; `transmode` defaults to 1 (sequential).
    pub fn from_fmtp(packetmode: u32, transmode: u32) -> Self {
        match (packetmode, transmode) {
            (0, _) => PacketTransmissionMode::Codestream,
            (_, 0) => PacketTransmissionMode::SliceOutOfOrder,
            _ => PacketTransmissionMode::SliceSequential,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketTransmissionMode::Codestream => "codestream",
            PacketTransmissionMode::SliceSequential => "slice_sequential",
            PacketTransmissionMode::SliceOutOfOrder => "slice_out_of_order",
        }
    }
}

/// Parameters of a JPEG XS (`video/jxsv`) flow per ST 2110-22 and
/// BCP-006-01.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJxsvParams {
    pub sampling: String,
    pub width: u64,
    pub height: u64,
    pub exact_framerate: Rational,
    pub depth: u32,
    pub interlace: bool,
    pub tcs: String,
    pub colorimetry: String,
    pub profile: Option<String>,
    pub level: Option<String>,
    pub sublevel: Option<String>,
    pub packet_transmission_mode: PacketTransmissionMode,
    pub sender_type: Option<String>,
}

impl VideoJxsvParams {
    pub fn from_media(media: &MediaDescription) -> Result<Self> {
        let fmtp =
            find_fmtp(media)?.ok_or_else(|| Error::MissingAttribute(names::FMTP))?;
        let packetmode = fmtp
            .parameter("packetmode")
            .map(str::parse)
            .transpose()?
            .unwrap_or(0);
        let transmode = fmtp
            .parameter("transmode")
            .map(str::parse)
            .transpose()?
            .unwrap_or(1);
        Ok(Self {
            sampling: required(&fmtp, "sampling")?.to_string(),
            width: required(&fmtp, "width")?.parse()?,
            height: required(&fmtp, "height")?.parse()?,
            exact_framerate: required(&fmtp, "exactframerate")?.parse()?,
            depth: required(&fmtp, "depth")?.parse()?,
            interlace: fmtp.parameter("interlace").is_some(),
            tcs: fmtp.parameter("TCS").unwrap_or("SDR").to_string(),
            colorimetry: required(&fmtp, "colorimetry")?.to_string(),
            profile: fmtp.parameter("profile").map(str::to_string),
            level: fmtp.parameter("level").map(str::to_string),
            sublevel: fmtp.parameter("sublevel").map(str::to_string),
            packet_transmission_mode: PacketTransmissionMode::from_fmtp(packetmode, transmode),
            sender_type: fmtp.parameter("TP").map(str::to_string),
        })
    }
}

/// Parameters of a linear PCM (`audio/L16`, `audio/L24`) flow per
/// ST 2110-30.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParams {
    pub channel_count: u32,
    pub sample_rate: Rational,
    pub bit_depth: u32,
    pub channel_order: Option<String>,
    /// Media-level `ptime` in milliseconds.
    pub packet_time: Option<f64>,
    /// Media-level `maxptime` in milliseconds.
    pub max_packet_time: Option<f64>,
}

impl AudioParams {
    pub fn from_media(media: &MediaDescription) -> Result<Self> {
        let rtpmap = find_rtpmap(media)?;
        let bit_depth = rtpmap
            .encoding_name
            .strip_prefix('L')
            .and_then(|depth| depth.parse().ok())
            .ok_or_else(|| {
                Error::InvalidFormatParameter(format!(
                    "not a linear PCM encoding: {}",
                    rtpmap.encoding_name
                ))
            })?;
        let channel_count = match &rtpmap.encoding_params {
            Some(params) => params.parse()?,
            None => 1,
        };
        let fmtp = find_fmtp(media)?;
        let parse_time = |value: &str| -> Result<f64> {
            value
                .trim()
                .parse()
                .map_err(|_| Error::ParsingError(format!("invalid packet time: {}", value)))
        };
        Ok(Self {
            channel_count,
            sample_rate: Rational::from(rtpmap.clock_rate as u64),
            bit_depth,
            channel_order: fmtp
                .as_ref()
                .and_then(|f| f.parameter("channel-order"))
                .map(str::to_string),
            packet_time: media
                .attribute_value(names::PTIME)
                .map(parse_time)
                .transpose()?,
            max_packet_time: media
                .attribute_value(names::MAXPTIME)
                .map(parse_time)
                .transpose()?,
        })
    }
}

/// A DID/SDID pair identifying a SMPTE 291 ancillary data packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DidSdid {
    pub did: u8,
    pub sdid: u8,
}

impl DidSdid {
    /// Parses the `{0xNN,0xNN}` form used in ST 2110-40 `fmtp` parameters.
    pub fn parse(value: &str) -> Result<Self> {
        let inner = value
            .trim()
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .ok_or_else(|| Error::InvalidFormatParameter(format!("invalid DID_SDID: {}", value)))?;
        let (did, sdid) = inner
            .split_once(',')
            .ok_or_else(|| Error::InvalidFormatParameter(format!("invalid DID_SDID: {}", value)))?;
        let parse_hex = |s: &str| -> Result<u8> {
            let s = s.trim();
            let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
            u8::from_str_radix(digits, 16)
                .map_err(|_| Error::InvalidFormatParameter(format!("invalid DID_SDID: {}", value)))
        };
        Ok(Self {
            did: parse_hex(did)?,
            sdid: parse_hex(sdid)?,
        })
    }
}

/// Parameters of a SMPTE 291 ancillary (`video/smpte291`) flow per
/// ST 2110-40.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smpte291Params {
    pub did_sdids: Vec<DidSdid>,
    pub exact_framerate: Option<Rational>,
}

impl Smpte291Params {
    pub fn from_media(media: &MediaDescription) -> Result<Self> {
        let fmtp = find_fmtp(media)?;
        let mut did_sdids = Vec::new();
        let mut exact_framerate = None;
        if let Some(fmtp) = &fmtp {
            for (key, value) in &fmtp.parameters {
                if key == "DID_SDID" {
                    did_sdids.push(DidSdid::parse(value)?);
                } else if key == "exactframerate" {
                    exact_framerate = Some(value.parse()?);
                }
            }
        }
        Ok(Self {
            did_sdids,
            exact_framerate,
        })
    }
}

/// Parameters of a SMPTE 2022-6 (`video/SMPTE2022-6`) mux flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smpte2022_6Params {
    pub exact_framerate: Option<Rational>,
}

impl Smpte2022_6Params {
    pub fn from_media(media: &MediaDescription) -> Result<Self> {
        let fmtp = find_fmtp(media)?;
        Ok(Self {
            exact_framerate: fmtp
                .as_ref()
                .and_then(|f| f.parameter("exactframerate"))
                .map(str::parse)
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_media_line;
    use crate::types::Attribute;

    fn video_media() -> MediaDescription {
        let mut media = parse_media_line("video 5020 RTP/AVP 96").unwrap();
        media.attributes.push(Attribute::value("rtpmap", "96 raw/90000"));
        media.attributes.push(Attribute::value(
            "fmtp",
            "96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=50; depth=10; \
             TCS=SDR; colorimetry=BT709; PM=2110GPM; SSN=ST2110-20:2017; TP=2110TPN; ",
        ));
        media
    }

    #[test]
    fn test_video_raw_params() {
        let params = VideoRawParams::from_media(&video_media()).unwrap();
        assert_eq!(params.sampling, "YCbCr-4:2:2");
        assert_eq!(params.width, 1920);
        assert_eq!(params.height, 1080);
        assert_eq!(params.exact_framerate, Rational::new(50, 1));
        assert_eq!(params.depth, 10);
        assert!(!params.interlace);
        assert_eq!(params.colorimetry, "BT709");
        assert_eq!(params.sender_type.as_deref(), Some("2110TPN"));
    }

    #[test]
    fn test_video_raw_interlaced() {
        let mut media = video_media();
        media.attributes[1] = Attribute::value(
            "fmtp",
            "96 sampling=YCbCr-4:2:2; width=1920; height=1080; exactframerate=25; depth=10; \
             interlace; colorimetry=BT709",
        );
        let params = VideoRawParams::from_media(&media).unwrap();
        assert!(params.interlace);
        assert_eq!(params.tcs, "SDR");
    }

    #[test]
    fn test_video_raw_missing_fmtp() {
        let mut media = video_media();
        media.remove_attributes("fmtp");
        assert!(VideoRawParams::from_media(&media).is_err());
    }

    #[test]
    fn test_audio_params() {
        let mut media = parse_media_line("audio 5030 RTP/AVP 97").unwrap();
        media
            .attributes
            .push(Attribute::value("rtpmap", "97 L24/48000/2"));
        media.attributes.push(Attribute::value(
            "fmtp",
            "97 channel-order=SMPTE2110.(ST); ",
        ));
        media.attributes.push(Attribute::value("ptime", "1"));
        let params = AudioParams::from_media(&media).unwrap();
        assert_eq!(params.channel_count, 2);
        assert_eq!(params.sample_rate, Rational::new(48000, 1));
        assert_eq!(params.bit_depth, 24);
        assert_eq!(params.channel_order.as_deref(), Some("SMPTE2110.(ST)"));
        assert_eq!(params.packet_time, Some(1.0));
        assert_eq!(params.max_packet_time, None);
    }

    #[test]
    fn test_audio_params_not_pcm() {
        let mut media = parse_media_line("audio 5030 RTP/AVP 0").unwrap();
        media.attributes.push(Attribute::value("rtpmap", "0 PCMU/8000"));
        assert!(AudioParams::from_media(&media).is_err());
    }

    #[test]
    fn test_did_sdid_parse() {
        assert_eq!(
            DidSdid::parse("{0x41,0x01}").unwrap(),
            DidSdid { did: 0x41, sdid: 0x01 }
        );
        assert!(DidSdid::parse("0x41,0x01").is_err());
        assert!(DidSdid::parse("{0x41}").is_err());
    }

    #[test]
    fn test_smpte291_params() {
        let mut media = parse_media_line("video 5040 RTP/AVP 100").unwrap();
        media
            .attributes
            .push(Attribute::value("rtpmap", "100 smpte291/90000"));
        media.attributes.push(Attribute::value(
            "fmtp",
            "100 DID_SDID={0x41,0x01}; DID_SDID={0x60,0x60}; exactframerate=50",
        ));
        let params = Smpte291Params::from_media(&media).unwrap();
        assert_eq!(params.did_sdids.len(), 2);
        assert_eq!(params.did_sdids[1], DidSdid { did: 0x60, sdid: 0x60 });
        assert_eq!(params.exact_framerate, Some(Rational::new(50, 1)));
    }

    #[test]
    fn test_jxsv_packet_transmission_mode() {
        assert_eq!(
            PacketTransmissionMode::from_fmtp(0, 1),
            PacketTransmissionMode::Codestream
        );
        assert_eq!(
            PacketTransmissionMode::from_fmtp(1, 1),
            PacketTransmissionMode::SliceSequential
        );
        assert_eq!(
            PacketTransmissionMode::from_fmtp(1, 0),
            PacketTransmissionMode::SliceOutOfOrder
        );
    }
}
