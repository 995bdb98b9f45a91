//! Repeatable resource identity
//!
//! Every resource UUID is derived from the configured seed string, so a
//! node restarted with the same configuration registers with the same
//! identity. The derivation is a name-based (version 5) UUID and must not
//! change: it is the contract that keeps registered identities stable
//! across versions and platforms.

use std::net::Ipv4Addr;

use sha1::{Digest, Sha1};
use uuid::Uuid;

use crate::resources::ResourceKind;

/// The fixed namespace the seed string is hashed into
/// (`18daddcf-a234-4f59-808a-dbf6a42e17bb`).
pub const SEED_NAMESPACE: Uuid = Uuid::from_u128(0x18daddcf_a234_4f59_808a_dbf6a42e17bb);

/// Derive the seed id for a node from its configured seed string.
pub fn make_seed_id(seed: &str) -> Uuid {
    Uuid::new_v5(&SEED_NAMESPACE, seed.as_bytes())
}

/// Derive the repeatable id of a resource.
///
/// The node and device use an empty `internal_id`.
pub fn make_id(seed_id: &Uuid, kind: ResourceKind, internal_id: &str) -> Uuid {
    let name = format!("/x-nmos/node/{}/{}", kind.as_str(), internal_id);
    Uuid::new_v5(seed_id, name.as_bytes())
}

/// Derive a repeatable source-specific multicast address for one leg of a
/// sender.
///
/// The result lies in the source-specific multicast block reserved for
/// local host allocation, 232.0.1.0 - 232.255.255.255; see
/// <https://www.iana.org/assignments/multicast-addresses/multicast-addresses.xhtml#multicast-addresses-10>
pub fn source_specific_multicast_v4(sender_id: &Uuid, leg: usize) -> Ipv4Addr {
    let name = format!("{}/{}", sender_id, leg);
    let digest = Sha1::digest(name.as_bytes());
    // low 32 bits of the digest, network order
    let mut octets = [
        digest[digest.len() - 4],
        digest[digest.len() - 3],
        digest[digest.len() - 2],
        digest[digest.len() - 1],
    ];
    octets[0] = 232;
    octets[2] |= 1;
    Ipv4Addr::from(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_id_is_repeatable() {
        let a = make_seed_id("nmos-api.local:8080");
        let b = make_seed_id("nmos-api.local:8080");
        assert_eq!(a, b);
        assert_ne!(a, make_seed_id("nmos-api.local:8081"));
    }

    #[test]
    fn test_make_id_is_repeatable() {
        let seed_id = make_seed_id("nmos-api.local:8080");
        let a = make_id(&seed_id, ResourceKind::Sender, "sink-0");
        let b = make_id(&seed_id, ResourceKind::Sender, "sink-0");
        assert_eq!(a, b);
    }

    #[test]
    fn test_make_id_distinct_per_kind_and_internal_id() {
        let seed_id = make_seed_id("nmos-api.local:8080");
        let sender = make_id(&seed_id, ResourceKind::Sender, "sink-0");
        let receiver = make_id(&seed_id, ResourceKind::Receiver, "sink-0");
        let other = make_id(&seed_id, ResourceKind::Sender, "sink-1");
        assert_ne!(sender, receiver);
        assert_ne!(sender, other);
    }

    #[test]
    fn test_node_and_device_ids_use_empty_internal_id() {
        let seed_id = make_seed_id("nmos-api.local:8080");
        let node = make_id(&seed_id, ResourceKind::Node, "");
        let expected = Uuid::new_v5(&seed_id, b"/x-nmos/node/node/");
        assert_eq!(node, expected);
    }

    #[test]
    fn test_multicast_address_block() {
        let sender_id = make_id(&make_seed_id("seed"), ResourceKind::Sender, "sink-0");
        for leg in 0..4 {
            let address = source_specific_multicast_v4(&sender_id, leg);
            let octets = address.octets();
            assert_eq!(octets[0], 232);
            assert_eq!(octets[2] & 1, 1);
        }
    }

    #[test]
    fn test_multicast_address_is_repeatable_and_leg_specific() {
        let sender_id = make_id(&make_seed_id("seed"), ResourceKind::Sender, "sink-0");
        assert_eq!(
            source_specific_multicast_v4(&sender_id, 0),
            source_specific_multicast_v4(&sender_id, 0)
        );
        assert_ne!(
            source_specific_multicast_v4(&sender_id, 0),
            source_specific_multicast_v4(&sender_id, 1)
        );
    }
}
