use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or generating SDP data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A line did not match the `<type>=<value>` SDP record form
    #[error("Invalid SDP line: {0}")]
    InvalidLine(String),

    /// A required session-level field is missing
    #[error("Missing required SDP field: {0}")]
    MissingField(&'static str),

    /// A field or attribute value could not be parsed
    #[error("SDP parsing error: {0}")]
    ParsingError(String),

    /// An attribute required by the node model is absent
    #[error("Missing required SDP attribute: {0}")]
    MissingAttribute(&'static str),

    /// The media type is not one of the supported ST 2110 / ST 2022-6 payloads
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A format-specific (fmtp) parameter is missing or malformed
    #[error("Invalid format parameter: {0}")]
    InvalidFormatParameter(String),

    /// SDP generation failed
    #[error("SDP generation error: {0}")]
    FormatError(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                Error::ParsingError(format!("failed near {:?}: {:?}", e.input, e.code))
            }
            nom::Err::Incomplete(_) => Error::ParsingError("incomplete input".to_string()),
        }
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParsingError(format!("failed to parse integer: {}", err))
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(err: std::net::AddrParseError) -> Self {
        Error::ParsingError(format!("failed to parse address: {}", err))
    }
}
