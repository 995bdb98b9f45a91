//! Node settings
//!
//! Instance-scoped configuration threaded through the model: host
//! identity, HTTP surface location, labels and tags, the derived seed id,
//! registration tuning, per-clock PTP domains, and the original SDP data
//! of every configured sender and receiver (used for transport-file
//! synthesis and default activation).

use std::collections::BTreeMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::id::make_seed_id;

/// The default IS-04 registration heartbeat interval, in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host_name: String,
    /// The DNS domain the host name sits in; used for unicast DNS-SD.
    pub domain: String,
    pub host_addresses: Vec<String>,
    pub http_port: u16,

    pub node_label: String,
    pub node_description: String,
    pub node_tags: Value,
    pub device_label: String,
    pub device_description: String,
    pub device_tags: Value,

    pub seed_id: Uuid,
    pub logging_level: i32,

    /// Registration heartbeat interval in seconds; updated from the
    /// system-global resource when one is discovered.
    pub registration_heartbeat_interval: u64,
    /// Upper bound for discovery/registration retry backoff, in seconds.
    pub discovery_backoff_max: u64,

    /// PTP domain number per node clock name.
    pub clocks: BTreeMap<String, i64>,
    /// Original SDP data per sender id.
    pub senders: BTreeMap<Uuid, String>,
    /// Original SDP data per receiver id.
    pub receivers: BTreeMap<Uuid, String>,
}

impl Settings {
    /// Minimal settings for the given host identity and seed; labels and
    /// tags default to empty and can be filled by the embedding layer.
    pub fn for_host(host_name: &str, host_addresses: &[String], http_port: u16, seed: &str) -> Self {
        let domain = host_name
            .split_once('.')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_default();
        Self {
            host_name: host_name.to_string(),
            domain,
            host_addresses: host_addresses.to_vec(),
            http_port,
            node_label: String::new(),
            node_description: String::new(),
            node_tags: json!({}),
            device_label: String::new(),
            device_description: String::new(),
            device_tags: json!({}),
            seed_id: make_seed_id(seed),
            logging_level: 0,
            registration_heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            discovery_backoff_max: 30,
            clocks: BTreeMap::new(),
            senders: BTreeMap::new(),
            receivers: BTreeMap::new(),
        }
    }

    /// The node's HTTP href, e.g. `http://nmos-node.local:8080/`.
    pub fn http_href(&self) -> String {
        format!("http://{}:{}/", self.host_name, self.http_port)
    }

    /// The IS-05 Connection API base advertised in device controls.
    pub fn connection_api_href(&self) -> String {
        format!(
            "http://{}:{}/x-nmos/connection/v1.1/",
            self.host_name, self.http_port
        )
    }

    /// The manifest href for a sender: its transport file endpoint.
    pub fn manifest_href(&self, sender_id: &Uuid) -> String {
        format!(
            "{}single/senders/{}/transportfile/",
            self.connection_api_href(),
            sender_id
        )
    }

    /// Whether the host name calls for multicast DNS-SD discovery.
    pub fn is_mdns_host(&self) -> bool {
        self.host_name.ends_with(".local")
    }

    /// Merge a discovered IS-09 system-global resource into the settings.
    ///
    /// Incoming scalar values replace the current ones; arrays are
    /// replaced wholesale. Only the parameters the node acts on are
    /// merged.
    pub fn merge_system_global(&mut self, global: &Value) {
        if let Some(interval) = global["is04"]["heartbeat_interval"].as_u64() {
            self.registration_heartbeat_interval = interval;
        }
        if let Some(domain) = global["ptp"]["domain_number"].as_i64() {
            for ptp_domain in self.clocks.values_mut() {
                *ptp_domain = domain;
            }
        }
    }
}
