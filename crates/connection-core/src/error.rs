use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the connection management engine
#[derive(Error, Debug)]
pub enum Error {
    /// The staged patch does not conform to the endpoint schema
    #[error("Invalid staged patch: {0}")]
    Validation(String),

    /// No sender or receiver with the given id
    #[error("Unknown connection resource: {0}")]
    NotFound(String),

    /// SDP processing failed
    #[error(transparent)]
    Sdp(#[from] rnmos_sdp_core::Error),

    /// The node model rejected the edit
    #[error(transparent)]
    Node(#[from] rnmos_node_core::Error),

    /// A cross-resource invariant does not hold
    #[error("Internal connection error: {0}")]
    Internal(String),
}
