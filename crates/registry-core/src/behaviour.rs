//! Registered operation
//!
//! The agent discovers a registry, registers every node resource with it,
//! then keeps the registration alive: heartbeats on the configured
//! interval, incremental updates whenever the model changes, deletions
//! for removed resources. Failures escalate retry -> re-register ->
//! re-discover, with exponential backoff bounded by the settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rnmos_node_core::{make_id, Model, ResourceKind, SharedModel, Version};

use crate::client::RegistrationClient;
use crate::discovery::{self, RegistryEndpoint};
use crate::error::{Error, Result};

/// Registration order: parents before children.
const REGISTRATION_ORDER: [ResourceKind; 6] = [
    ResourceKind::Node,
    ResourceKind::Device,
    ResourceKind::Source,
    ResourceKind::Flow,
    ResourceKind::Sender,
    ResourceKind::Receiver,
];

/// Runs registry discovery and registered operation on its own task.
pub struct DiscoveryAgent {
    model: SharedModel,
    running: Arc<RwLock<bool>>,
    handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl DiscoveryAgent {
    pub fn new(model: SharedModel) -> Self {
        Self {
            model,
            running: Arc::new(RwLock::new(false)),
            handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Start registered operation.
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            debug!("discovery agent already running");
            return;
        }
        *running = true;

        let model = self.model.clone();
        let running_flag = self.running.clone();
        let handle = tokio::spawn(async move {
            run(model, running_flag).await;
        });
        *self.handle.write().await = Some(handle);
        info!("discovery agent started");
    }

    /// Stop registered operation.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        if let Some(handle) = self.handle.write().await.take() {
            handle.abort();
            info!("discovery agent stopped");
        }
    }
}

async fn run(model: SharedModel, running: Arc<RwLock<bool>>) {
    let mut backoff = Duration::from_secs(1);
    while *running.read().await {
        let (is_mdns, domain, backoff_max) = {
            let model = model.read().await;
            (
                model.settings.is_mdns_host(),
                model.settings.domain.clone(),
                Duration::from_secs(model.settings.discovery_backoff_max.max(1)),
            )
        };

        let endpoints =
            match discovery::discover(is_mdns, &domain, Duration::from_secs(2)).await {
                Ok(endpoints) => {
                    backoff = Duration::from_secs(1);
                    endpoints
                }
                Err(err) => {
                    warn!(error = %err, "registry discovery failed");
                    sleep_with_jitter(backoff).await;
                    backoff = (backoff * 2).min(backoff_max);
                    continue;
                }
            };

        for endpoint in endpoints {
            if !*running.read().await {
                return;
            }
            info!(base_url = %endpoint.base_url, "started registered operation with Registration API");
            if let Err(err) = run_registered(&model, &endpoint, &running).await {
                warn!(base_url = %endpoint.base_url, error = %err, "registered operation ended");
            }
            info!("stopped registered operation");
        }
    }
}

async fn sleep_with_jitter(base: Duration) {
    let jitter = rand::thread_rng().gen_range(0..=base.as_millis().max(1) as u64 / 4);
    tokio::time::sleep(base + Duration::from_millis(jitter)).await;
}

/// Mirror the model into one registry until it fails hard. Returning `Ok`
/// means the agent was stopped; `Err` sends the caller to the next
/// registry or back to discovery.
async fn run_registered(
    model: &SharedModel,
    endpoint: &RegistryEndpoint,
    running: &Arc<RwLock<bool>>,
) -> Result<()> {
    let client = RegistrationClient::new(&endpoint.base_url)?;
    let mut registered: HashMap<Uuid, (ResourceKind, Version)> = HashMap::new();

    register_all(model, &client, &mut registered).await?;
    let mut synced_epoch = {
        let model = model.read().await;
        model.epoch()
    };

    loop {
        if !*running.read().await {
            deregister_node(model, &client).await;
            return Ok(());
        }

        let (notify, epoch, interval, node_id) = {
            let model = model.read().await;
            (
                model.notifier(),
                model.epoch(),
                Duration::from_secs(model.settings.registration_heartbeat_interval.max(1)),
                make_id(&model.settings.seed_id, ResourceKind::Node, ""),
            )
        };
        let notified = notify.notified();
        tokio::pin!(notified);

        if epoch > synced_epoch {
            mirror_changes(model, &client, &mut registered).await?;
            synced_epoch = epoch;
            continue;
        }

        tokio::select! {
            _ = &mut notified => {
                // epoch re-checked at the top of the loop
            }
            _ = tokio::time::sleep(interval) => {
                match client.heartbeat(&node_id).await {
                    Ok(()) => {}
                    Err(Error::NotRegistered) => {
                        info!("registry expired this node; re-registering");
                        registered.clear();
                        register_all(model, &client, &mut registered).await?;
                    }
                    Err(err) => {
                        warn!(error = %err, "heartbeat failed; retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        match client.heartbeat(&node_id).await {
                            Ok(()) => {}
                            Err(_) => {
                                registered.clear();
                                register_all(model, &client, &mut registered).await?;
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn register_all(
    model: &SharedModel,
    client: &RegistrationClient,
    registered: &mut HashMap<Uuid, (ResourceKind, Version)>,
) -> Result<()> {
    let snapshot = snapshot_resources(&*model.read().await);
    for (id, kind, version, data) in snapshot {
        client.register(kind.as_str(), &data).await?;
        registered.insert(id, (kind, version));
    }
    info!(resources = registered.len(), "registered all resources");
    Ok(())
}

/// Push creations and updates, then deletions, child types first.
async fn mirror_changes(
    model: &SharedModel,
    client: &RegistrationClient,
    registered: &mut HashMap<Uuid, (ResourceKind, Version)>,
) -> Result<()> {
    let snapshot = snapshot_resources(&*model.read().await);

    let mut seen = Vec::with_capacity(snapshot.len());
    for (id, kind, version, data) in snapshot {
        seen.push(id);
        if registered.get(&id).map(|(_, v)| *v) != Some(version) {
            debug!(id = %id, kind = %kind, "registering updated resource");
            client.register(kind.as_str(), &data).await?;
            registered.insert(id, (kind, version));
        }
    }

    let mut removed: Vec<(Uuid, ResourceKind)> = registered
        .iter()
        .filter(|(id, _)| !seen.contains(id))
        .map(|(id, (kind, _))| (*id, *kind))
        .collect();
    removed.sort_by_key(|(_, kind)| std::cmp::Reverse(kind_rank(*kind)));
    for (id, kind) in removed {
        debug!(id = %id, kind = %kind, "deleting removed resource");
        client.delete(kind.as_str(), &id).await?;
        registered.remove(&id);
    }
    Ok(())
}

fn kind_rank(kind: ResourceKind) -> usize {
    REGISTRATION_ORDER
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(usize::MAX)
}

fn snapshot_resources(
    model: &Model,
) -> Vec<(Uuid, ResourceKind, Version, serde_json::Value)> {
    let mut snapshot = Vec::new();
    for kind in REGISTRATION_ORDER {
        for resource in model.node_resources.iter_kind(kind) {
            let version = resource.version().unwrap_or_default();
            snapshot.push((resource.id, kind, version, resource.data.clone()));
        }
    }
    snapshot
}

async fn deregister_node(model: &SharedModel, client: &RegistrationClient) {
    let node_id = {
        let model = model.read().await;
        make_id(&model.settings.seed_id, ResourceKind::Node, "")
    };
    // best effort; the registry garbage collects on missed heartbeats
    if let Err(err) = client.delete(ResourceKind::Node.as_str(), &node_id).await {
        debug!(error = %err, "node deregistration failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_rank_orders_parents_first() {
        assert!(kind_rank(ResourceKind::Node) < kind_rank(ResourceKind::Device));
        assert!(kind_rank(ResourceKind::Device) < kind_rank(ResourceKind::Source));
        assert!(kind_rank(ResourceKind::Source) < kind_rank(ResourceKind::Flow));
        assert!(kind_rank(ResourceKind::Flow) < kind_rank(ResourceKind::Sender));
        assert!(kind_rank(ResourceKind::Sender) < kind_rank(ResourceKind::Receiver));
    }
}
