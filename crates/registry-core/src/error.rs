use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from registry discovery and registration
#[derive(Error, Debug)]
pub enum Error {
    /// No registry could be discovered
    #[error("No registry discovered")]
    NoRegistry,

    /// DNS-SD browsing or lookup failed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// An HTTP request to the registry failed
    #[error("Registry request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The registry rejected a request
    #[error("Registry rejected request: {0}")]
    Rejected(u16),

    /// The registry no longer knows this node; re-registration is needed
    #[error("Node is not registered")]
    NotRegistered,
}
