//! Host network interfaces
//!
//! The embedding application supplies the addresses the node may bind
//! senders and receivers to. Interface bindings in IS-04 resources refer
//! to interfaces by name; when the host provides bare addresses the
//! address string doubles as the interface name.

use sha1::{Digest, Sha1};

/// A host network interface the node can bind streams to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterface {
    pub name: String,
    /// The interface hardware address, `xx-xx-xx-xx-xx-xx`, if known.
    pub physical_address: Option<String>,
    pub addresses: Vec<String>,
}

impl HostInterface {
    /// An interface named after its single address, as used when the host
    /// configures plain IP addresses.
    pub fn from_address(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            name: address.clone(),
            physical_address: None,
            addresses: vec![address],
        }
    }

    /// The hardware address to publish in the node's `interfaces[]`: the
    /// real one when known, otherwise a repeatable locally administered
    /// address derived from the interface name.
    pub fn port_id(&self) -> String {
        match &self.physical_address {
            Some(address) => address.to_lowercase(),
            None => {
                let digest = Sha1::digest(self.name.as_bytes());
                // locally administered, unicast
                let first = (digest[0] | 0x02) & 0xfe;
                format!(
                    "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
                    first, digest[1], digest[2], digest[3], digest[4], digest[5]
                )
            }
        }
    }
}

/// Find the interface carrying the specified address.
pub fn find_interface<'a>(
    interfaces: &'a [HostInterface],
    address: &str,
) -> Option<&'a HostInterface> {
    interfaces
        .iter()
        .find(|interface| interface.addresses.iter().any(|a| a == address))
}
