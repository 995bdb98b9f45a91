//! IS-04 resources
//!
//! Resources are held as schema-shaped JSON bodies under a typed envelope;
//! the store is the single source of truth and every cross-reference is an
//! id resolved by lookup. [`fields`] provides the typed accessors the
//! business rules navigate with, [`build`] the constructors.

pub mod build;
pub mod connection;
pub mod fields;

use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::version::Version;

/// The IS-04 resource types managed by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Node,
    Device,
    Source,
    Flow,
    Sender,
    Receiver,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Node => "node",
            ResourceKind::Device => "device",
            ResourceKind::Source => "source",
            ResourceKind::Flow => "flow",
            ResourceKind::Sender => "sender",
            ResourceKind::Receiver => "receiver",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource tag keys used by the node.
pub mod tags {
    /// Reverse lookup tag holding the host-supplied internal id.
    pub const INTERNAL_ID: &str = "urn:x-nvnmos:id";
    /// BCP-002-01 natural grouping hint.
    pub const GROUP_HINT: &str = "urn:x-nmos:tag:grouphint/v1.0";
    /// BCP-002-02 asset distinguishing information.
    pub const ASSET_MANUFACTURER: &str = "urn:x-nmos:tag:asset:manufacturer/v1.0";
    pub const ASSET_PRODUCT: &str = "urn:x-nmos:tag:asset:product/v1.0";
    pub const ASSET_INSTANCE_ID: &str = "urn:x-nmos:tag:asset:instance-id/v1.0";
    pub const ASSET_FUNCTION: &str = "urn:x-nmos:tag:asset:function/v1.0";
}

/// A resource envelope: stable id, type tag, and the schema-shaped body.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: Uuid,
    pub kind: ResourceKind,
    pub data: Value,
}

impl Resource {
    pub fn new(id: Uuid, kind: ResourceKind, data: Value) -> Self {
        Self { id, kind, data }
    }

    /// The current version stamp from the body.
    pub fn version(&self) -> Result<Version> {
        self.data["version"]
            .as_str()
            .ok_or_else(|| Error::Internal(format!("resource {} has no version", self.id)))?
            .parse()
    }

    pub fn set_version(&mut self, version: Version) {
        self.data["version"] = Value::String(version.to_string());
    }

    /// First value of the named tag, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.data["tags"][key]
            .as_array()
            .and_then(|values| values.first())
            .and_then(Value::as_str)
    }

    /// Sets the named tag to a single value.
    pub fn set_tag(&mut self, key: &str, value: &str) {
        self.data["tags"][key] = Value::Array(vec![Value::String(value.to_string())]);
    }

    /// The host-supplied internal id, from the reverse lookup tag.
    pub fn internal_id(&self) -> Option<&str> {
        self.tag(tags::INTERNAL_ID)
    }

    /// The BCP-002-01 group hint, if tagged.
    pub fn group_hint(&self) -> Option<&str> {
        self.tag(tags::GROUP_HINT)
    }
}
