//! The indexed resource store
//!
//! One store holds the IS-04 resources, a second the IS-05 connection
//! twins. Every insert, modify and erase atomically advances the
//! resource's version stamp; stamps issued by one store are strictly
//! increasing even across erase/re-insert of the same id.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::resources::{Resource, ResourceKind};
use crate::version::Version;

#[derive(Debug, Default)]
pub struct ResourceStore {
    resources: BTreeMap<Uuid, Resource>,
    last_version: Version,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next version stamp: the wall clock, clamped to strictly exceed
    /// every stamp this store has issued.
    fn next_version(&mut self) -> Version {
        let version = Version::now().max(self.last_version.successor());
        self.last_version = version;
        version
    }

    /// Insert a resource, stamping its version.
    pub fn insert(&mut self, mut resource: Resource) -> Result<()> {
        if self.resources.contains_key(&resource.id) {
            return Err(Error::AlreadyExists(resource.id));
        }
        resource.set_version(self.next_version());
        debug!(id = %resource.id, kind = %resource.kind, "inserted resource");
        self.resources.insert(resource.id, resource);
        Ok(())
    }

    /// Apply an edit to a resource, stamping a new version.
    pub fn modify<F>(&mut self, id: &Uuid, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Resource),
    {
        let version = self.next_version();
        let resource = self
            .resources
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("no such resource: {}", id)))?;
        edit(resource);
        resource.set_version(version);
        debug!(id = %id, "modified resource");
        Ok(())
    }

    /// Remove a resource, returning it if present.
    pub fn erase(&mut self, id: &Uuid) -> Option<Resource> {
        let removed = self.resources.remove(id);
        if removed.is_some() {
            debug!(id = %id, "erased resource");
        }
        removed
    }

    pub fn get(&self, id: &Uuid) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Find a resource by id and type.
    pub fn find(&self, id: &Uuid, kind: ResourceKind) -> Option<&Resource> {
        self.resources.get(id).filter(|r| r.kind == kind)
    }

    /// All resources of the given type, in id order.
    pub fn iter_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(move |r| r.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Reverse lookup of a sender or receiver through its internal id tag.
    pub fn find_by_internal_id(&self, kind: ResourceKind, internal_id: &str) -> Option<&Resource> {
        self.iter_kind(kind)
            .find(|r| r.internal_id() == Some(internal_id))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(id: Uuid, kind: ResourceKind) -> Resource {
        Resource::new(id, kind, json!({"version": "0:0", "tags": {}}))
    }

    #[test]
    fn test_insert_and_find() {
        let mut store = ResourceStore::new();
        let id = Uuid::new_v4();
        store.insert(resource(id, ResourceKind::Sender)).unwrap();
        assert!(store.find(&id, ResourceKind::Sender).is_some());
        assert!(store.find(&id, ResourceKind::Receiver).is_none());
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut store = ResourceStore::new();
        let id = Uuid::new_v4();
        store.insert(resource(id, ResourceKind::Sender)).unwrap();
        assert!(matches!(
            store.insert(resource(id, ResourceKind::Sender)),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_versions_strictly_increase() {
        let mut store = ResourceStore::new();
        let id = Uuid::new_v4();
        store.insert(resource(id, ResourceKind::Sender)).unwrap();
        let first = store.get(&id).unwrap().version().unwrap();
        store.modify(&id, |_| {}).unwrap();
        let second = store.get(&id).unwrap().version().unwrap();
        assert!(second > first);

        // strictly greater even across erase and re-insert
        store.erase(&id);
        store.insert(resource(id, ResourceKind::Sender)).unwrap();
        let third = store.get(&id).unwrap().version().unwrap();
        assert!(third > second);
    }

    #[test]
    fn test_iter_kind() {
        let mut store = ResourceStore::new();
        store
            .insert(resource(Uuid::new_v4(), ResourceKind::Sender))
            .unwrap();
        store
            .insert(resource(Uuid::new_v4(), ResourceKind::Receiver))
            .unwrap();
        assert_eq!(store.iter_kind(ResourceKind::Sender).count(), 1);
        assert_eq!(store.iter().count(), 2);
    }

    #[test]
    fn test_find_by_internal_id() {
        let mut store = ResourceStore::new();
        let id = Uuid::new_v4();
        let mut r = resource(id, ResourceKind::Sender);
        r.set_tag(crate::resources::tags::INTERNAL_ID, "sink-0");
        store.insert(r).unwrap();
        assert_eq!(
            store
                .find_by_internal_id(ResourceKind::Sender, "sink-0")
                .map(|r| r.id),
            Some(id)
        );
        assert!(store
            .find_by_internal_id(ResourceKind::Sender, "sink-1")
            .is_none());
    }
}
