//! # rnmos-registry-core
//!
//! The outward-facing behaviour of the rnmos NMOS node: discovering an
//! IS-04 registry through DNS-SD, mirroring the node's resources into it,
//! keeping the registration alive with heartbeats, and consuming IS-09
//! system-global configuration when one is advertised.
//!
//! Failure escalates in stages: a failed request is retried, repeated
//! failure re-registers from scratch, and a dead registry sends the agent
//! back to discovery with exponential backoff.

pub mod behaviour;
pub mod client;
pub mod discovery;
pub mod error;
pub mod system;

pub use behaviour::DiscoveryAgent;
pub use client::RegistrationClient;
pub use discovery::RegistryEndpoint;
pub use error::{Error, Result};
