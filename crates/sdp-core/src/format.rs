//! Media type identification
//!
//! The node supports the ST 2110 / ST 2022-6 payloads only; anything else
//! is a hard error at configuration time.

use std::fmt;

use crate::attributes::{names, parse_rtpmap};
use crate::error::{Error, Result};
use crate::types::MediaDescription;

/// An IANA media type, e.g. `video/raw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(pub String);

impl MediaType {
    pub const VIDEO_RAW: &'static str = "video/raw";
    pub const VIDEO_JXSV: &'static str = "video/jxsv";
    pub const AUDIO_L24: &'static str = "audio/L24";
    pub const AUDIO_L16: &'static str = "audio/L16";
    pub const VIDEO_SMPTE291: &'static str = "video/smpte291";
    pub const VIDEO_SMPTE2022_6: &'static str = "video/SMPTE2022-6";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four top-level NMOS formats a resource can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `video/raw` or `video/jxsv`
    Video,
    /// `audio/L24` or `audio/L16`
    Audio,
    /// `video/smpte291`
    Data,
    /// `video/SMPTE2022-6`
    Mux,
}

impl MediaKind {
    /// The IS-04 format URN for this kind.
    pub fn format_urn(&self) -> &'static str {
        match self {
            MediaKind::Video => "urn:x-nmos:format:video",
            MediaKind::Audio => "urn:x-nmos:format:audio",
            MediaKind::Data => "urn:x-nmos:format:data",
            MediaKind::Mux => "urn:x-nmos:format:mux",
        }
    }

    /// A short mnemonic used in generated labels.
    pub fn hint(&self) -> &'static str {
        match self {
            MediaKind::Video => "v",
            MediaKind::Audio => "a",
            MediaKind::Data => "d",
            MediaKind::Mux => "m",
        }
    }
}

/// Identify the supported format kind from a media type.
pub fn media_kind(media_type: &MediaType) -> Result<MediaKind> {
    match media_type.as_str() {
        MediaType::VIDEO_RAW | MediaType::VIDEO_JXSV => Ok(MediaKind::Video),
        MediaType::AUDIO_L24 | MediaType::AUDIO_L16 => Ok(MediaKind::Audio),
        MediaType::VIDEO_SMPTE291 => Ok(MediaKind::Data),
        MediaType::VIDEO_SMPTE2022_6 => Ok(MediaKind::Mux),
        other => Err(Error::UnsupportedMediaType(other.to_string())),
    }
}

/// Determine the media type of a media description from its `m=` line and
/// the `rtpmap` for its first payload format.
pub fn media_type_of(media: &MediaDescription) -> Result<MediaType> {
    let format = media
        .formats
        .first()
        .ok_or(Error::MissingAttribute(names::RTPMAP))?;
    let rtpmap = media
        .attributes
        .iter()
        .filter(|a| a.name == names::RTPMAP)
        .filter_map(|a| a.value.as_deref())
        .map(parse_rtpmap)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .find(|r| r.payload_type.to_string() == *format)
        .ok_or(Error::MissingAttribute(names::RTPMAP))?;
    Ok(MediaType(format!("{}/{}", media.media, rtpmap.encoding_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_media_line;
    use crate::types::Attribute;

    fn media_with_rtpmap(m_line: &str, rtpmap: &str) -> MediaDescription {
        let mut media = parse_media_line(m_line).unwrap();
        media.attributes.push(Attribute::value("rtpmap", rtpmap));
        media
    }

    #[test]
    fn test_media_type_of_video() {
        let media = media_with_rtpmap("video 5020 RTP/AVP 96", "96 raw/90000");
        assert_eq!(media_type_of(&media).unwrap().as_str(), "video/raw");
    }

    #[test]
    fn test_media_type_of_audio() {
        let media = media_with_rtpmap("audio 5030 RTP/AVP 97", "97 L24/48000/2");
        assert_eq!(media_type_of(&media).unwrap().as_str(), "audio/L24");
    }

    #[test]
    fn test_media_kind_mapping() {
        assert_eq!(
            media_kind(&MediaType("video/raw".to_string())).unwrap(),
            MediaKind::Video
        );
        assert_eq!(
            media_kind(&MediaType("video/jxsv".to_string())).unwrap(),
            MediaKind::Video
        );
        assert_eq!(
            media_kind(&MediaType("audio/L16".to_string())).unwrap(),
            MediaKind::Audio
        );
        assert_eq!(
            media_kind(&MediaType("video/smpte291".to_string())).unwrap(),
            MediaKind::Data
        );
        assert_eq!(
            media_kind(&MediaType("video/SMPTE2022-6".to_string())).unwrap(),
            MediaKind::Mux
        );
    }

    #[test]
    fn test_media_kind_unsupported() {
        assert!(matches!(
            media_kind(&MediaType("video/vp8".to_string())),
            Err(Error::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_media_type_missing_rtpmap() {
        let media = parse_media_line("video 5020 RTP/AVP 96").unwrap();
        assert!(media_type_of(&media).is_err());
    }
}
