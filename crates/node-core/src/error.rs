use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the node resource model
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration or SDP input; the model is unchanged
    #[error("Validation error: {0}")]
    Validation(String),

    /// SDP data could not be parsed or is unsupported
    #[error(transparent)]
    Sdp(#[from] rnmos_sdp_core::Error),

    /// No host interface matches a connection address
    #[error("No network interface corresponding to the connection address: {address} for: {internal_id}")]
    NoInterface {
        address: String,
        internal_id: String,
    },

    /// The referenced sender or receiver does not exist
    #[error("Could not find {kind} with internal id: {internal_id}")]
    UnknownInternalId { kind: String, internal_id: String },

    /// A resource id is already present in the store
    #[error("Resource already exists: {0}")]
    AlreadyExists(uuid::Uuid),

    /// A cross-resource invariant does not hold; the operation is aborted
    #[error("Internal model error: {0}")]
    Internal(String),
}
