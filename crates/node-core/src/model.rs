//! The shared node model
//!
//! The model bundles the two resource stores, the settings and the host
//! interface snapshot under a single reader/writer lock, the way every
//! mutating node operation expects: take the write guard, edit, notify
//! once, release.

use std::sync::Arc;

use tokio::sync::{Notify, RwLock};

use crate::interfaces::HostInterface;
use crate::settings::Settings;
use crate::store::ResourceStore;

pub struct Model {
    /// IS-04 resources: node, device, sources, flows, senders, receivers.
    pub node_resources: ResourceStore,
    /// IS-05 connection twins of the senders and receivers.
    pub connection_resources: ResourceStore,
    pub settings: Settings,
    /// Snapshot of the host interfaces the node may bind to.
    pub interfaces: Vec<HostInterface>,
    epoch: u64,
    notify: Arc<Notify>,
}

/// The model behind its lock, shared between the HTTP surface, the
/// connection engine and the registry mirror.
pub type SharedModel = Arc<RwLock<Model>>;

impl Model {
    pub fn new(settings: Settings, interfaces: Vec<HostInterface>) -> Self {
        Self {
            node_resources: ResourceStore::new(),
            connection_resources: ResourceStore::new(),
            settings,
            interfaces,
            epoch: 0,
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn into_shared(self) -> SharedModel {
        Arc::new(RwLock::new(self))
    }

    /// Publish one change event for the edit just made. Call exactly once
    /// per logical operation, while still holding the write guard.
    pub fn notify(&mut self) {
        self.epoch += 1;
        self.notify.notify_waiters();
    }

    /// The change epoch; increases by one per published change event.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The notifier observers wait on for change events.
    pub fn notifier(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_advances_epoch() {
        let mut model = Model::new(Settings::for_host("h.local", &[], 8080, "seed"), vec![]);
        assert_eq!(model.epoch(), 0);
        model.notify();
        model.notify();
        assert_eq!(model.epoch(), 2);
    }
}
