//! # rnmos
//!
//! An embeddable NMOS node for media applications.
//!
//! The node advertises itself on the network, registers with a discovered
//! IS-04 registry, exposes the IS-04 Node API and IS-05 Connection API,
//! and calls back into the host when a controller activates or
//! deactivates one of its senders or receivers.
//!
//! Senders and receivers are configured with SDP data carrying a few
//! custom attributes (`x-nvnmos-id`, `x-nvnmos-group-hint`,
//! `x-nvnmos-iface-ip`, `x-nvnmos-src-port`); see [`NodeConfig`].
//!
//! ```no_run
//! use rnmos::{NodeConfig, NodeServer};
//!
//! # async fn example(video_sdp: String) {
//! let mut config = NodeConfig::new("nmos-node.local", 8080);
//! config.host_addresses = vec!["192.0.2.10".to_string()];
//! config.seed = Some("nmos-node.local:8080".to_string());
//! config.senders = vec![video_sdp];
//!
//! let server = NodeServer::create(config).await.expect("node started");
//! // ... run the media pipeline ...
//! server.shutdown().await;
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod server;

// the member crates, for embedders that need the lower layers
pub use rnmos_connection_core as connection_core;
pub use rnmos_node_api as node_api;
pub use rnmos_node_core as node_core;
pub use rnmos_registry_core as registry_core;
pub use rnmos_sdp_core as sdp_core;

pub use config::{log_levels, AssetConfig, LogHandler, NodeConfig};
pub use rnmos_connection_core::RtpActivationHandler;
pub use server::NodeServer;
