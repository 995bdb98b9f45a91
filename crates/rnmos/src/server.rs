//! The embedding server
//!
//! [`NodeServer`] owns everything: the shared model, the connection
//! engine, the HTTP surface and the discovery agent. All fallible
//! operations at this boundary collapse to a boolean result after
//! logging; the model is never left partially edited.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rnmos_connection_core::{ConnectionEngine, SystemClock};
use rnmos_node_api::ApiState;
use rnmos_node_core::{ops, HostInterface, Model, SharedModel};
use rnmos_registry_core::{system, DiscoveryAgent};

use crate::config::NodeConfig;
use crate::logging::CallbackLayer;

pub struct NodeServer {
    model: SharedModel,
    engine: Arc<ConnectionEngine>,
    agent: DiscoveryAgent,
    http_shutdown: Option<oneshot::Sender<()>>,
    http_handle: Option<JoinHandle<()>>,
}

impl NodeServer {
    /// Initialize and start a node server: build the resource model from
    /// the configuration, open the HTTP APIs, and begin registry
    /// discovery. Returns `None` (after logging) when anything fails.
    pub async fn create(config: NodeConfig) -> Option<NodeServer> {
        if let Some(handler) = &config.on_log {
            let layer = CallbackLayer::new(
                handler.clone(),
                config.log_level,
                config.log_categories.clone(),
            );
            // a subscriber may already be installed (e.g. by the host)
            let _ = tracing_subscriber::registry().with(layer).try_init();
        }

        match Self::try_create(config).await {
            Ok(server) => Some(server),
            Err(err) => {
                error!(error = %err, "failed to start node server");
                None
            }
        }
    }

    async fn try_create(config: NodeConfig) -> anyhow::Result<NodeServer> {
        info!("starting node server");

        let settings = config.make_settings();
        let http_port = settings.http_port;
        let interfaces: Vec<HostInterface> = config
            .host_addresses
            .iter()
            .map(HostInterface::from_address)
            .collect();

        let mut model = Model::new(settings, interfaces);
        ops::init(&mut model)?;
        for sdp in &config.receivers {
            ops::add_receiver(&mut model, sdp)?;
        }
        for sdp in &config.senders {
            ops::add_sender(&mut model, sdp)?;
        }
        let model = model.into_shared();

        let engine = ConnectionEngine::new(
            model.clone(),
            Arc::new(SystemClock),
            config.on_activation.clone(),
        );

        info!("preparing for connections");
        let state = ApiState {
            model: model.clone(),
            engine: engine.clone(),
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let (http_shutdown, shutdown_rx) = oneshot::channel();
        let http_handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(err) = rnmos_node_api::serve_on(state, listener, shutdown).await {
                error!(error = %err, "node API server failed");
            }
        });

        // consume system-global configuration when one is advertised
        {
            let model = model.clone();
            tokio::spawn(async move {
                let _ = system::apply_system_global(&model).await;
            });
        }

        let agent = DiscoveryAgent::new(model.clone());
        agent.start().await;

        info!("ready for connections");
        Ok(NodeServer {
            model,
            engine,
            agent,
            http_shutdown: Some(http_shutdown),
            http_handle: Some(http_handle),
        })
    }

    /// The shared resource model, for advanced embedding.
    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    /// The connection engine, for advanced embedding.
    pub fn engine(&self) -> &Arc<ConnectionEngine> {
        &self.engine
    }

    /// Add a sender described by the given SDP data.
    pub async fn add_sender(&self, sdp: &str) -> bool {
        let mut model = self.model.write().await;
        match ops::add_sender(&mut model, sdp) {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "add_sender failed");
                false
            }
        }
    }

    /// Add a receiver described by the given SDP data.
    pub async fn add_receiver(&self, sdp: &str) -> bool {
        let mut model = self.model.write().await;
        match ops::add_receiver(&mut model, sdp) {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "add_receiver failed");
                false
            }
        }
    }

    /// Remove the sender with the given internal id.
    pub async fn remove_sender(&self, internal_id: &str) -> bool {
        let mut model = self.model.write().await;
        match ops::remove_sender(&mut model, internal_id) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "remove_sender failed");
                false
            }
        }
    }

    /// Remove the receiver with the given internal id.
    pub async fn remove_receiver(&self, internal_id: &str) -> bool {
        let mut model = self.model.write().await;
        match ops::remove_receiver(&mut model, internal_id) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "remove_receiver failed");
                false
            }
        }
    }

    /// Update the transport parameters of the sender or receiver with the
    /// given internal id from the SDP data, activating it; `None`
    /// deactivates it.
    pub async fn activate(&self, internal_id: &str, sdp: Option<&str>) -> bool {
        match self.engine.activate_rtp_connection(internal_id, sdp).await {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "activate failed");
                false
            }
        }
    }

    /// Stop the node: close the HTTP APIs and end registered operation.
    pub async fn shutdown(mut self) -> bool {
        info!("closing connections");
        self.agent.stop().await;
        if let Some(shutdown) = self.http_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.http_handle.take() {
            let _ = handle.await;
        }
        info!("stopped node server");
        true
    }
}
