//! # rnmos-node-core
//!
//! The resource model and business rules of the rnmos NMOS node.
//!
//! This crate holds:
//!
//! - deterministic resource identity derived from a seed string ([`id`])
//! - strictly increasing resource version stamps ([`version`])
//! - IS-04 resources as JSON bodies under a typed envelope, with builders
//!   and field accessors ([`resources`])
//! - the indexed resource stores, the shared model and its change
//!   notification ([`store`], [`model`])
//! - the node-level operations: initialization, adding and removing
//!   senders and receivers, and the interface and clock maintenance that
//!   keeps the node resource consistent ([`ops`])
//!
//! The IS-05 connection machinery builds on this crate from
//! `rnmos-connection-core`.

pub mod clock;
pub mod error;
pub mod id;
pub mod interfaces;
pub mod model;
pub mod ops;
pub mod resolve;
pub mod resources;
pub mod settings;
pub mod store;
pub mod version;

pub use error::{Error, Result};
pub use id::{make_id, make_seed_id, source_specific_multicast_v4};
pub use interfaces::HostInterface;
pub use model::{Model, SharedModel};
pub use resources::{Resource, ResourceKind};
pub use settings::Settings;
pub use store::ResourceStore;
pub use version::Version;
