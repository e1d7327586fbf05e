use crate::application::ports::LocalStore;
use crate::domain::entities::Resource;
use crate::domain::value_objects::{CollectionName, ResourceId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Canonical in-memory resource store, keyed by collection and id.
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<CollectionName, HashMap<ResourceId, Resource>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn list(&self, collection: &CollectionName) -> Vec<Resource> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|resources| resources.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for InMemoryStore {
    async fn get(&self, collection: &CollectionName, id: &ResourceId) -> Option<Resource> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|resources| resources.get(id))
            .cloned()
    }

    async fn upsert(&self, collection: &CollectionName, resource: Resource) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.clone())
            .or_default()
            .insert(resource.id.clone(), resource);
    }

    async fn remove(&self, collection: &CollectionName, id: &ResourceId) -> Option<Resource> {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|resources| resources.remove(id))
    }

    async fn len(&self, collection: &CollectionName) -> usize {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|resources| resources.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::OwnerId;
    use serde_json::Map;

    fn resource(id: &str) -> Resource {
        Resource::new(
            ResourceId::parse(id).unwrap(),
            OwnerId::parse("user-1").unwrap(),
            Map::new(),
        )
    }

    #[tokio::test]
    async fn upsert_replaces_single_canonical_copy() {
        let store = InMemoryStore::new();
        let notes = CollectionName::parse("notes").unwrap();

        store.upsert(&notes, resource("note-1")).await;
        let mut changed = resource("note-1");
        changed
            .fields
            .insert("title".into(), serde_json::json!("v2"));
        store.upsert(&notes, changed).await;

        assert_eq!(store.len(&notes).await, 1);
        let stored = store
            .get(&notes, &ResourceId::parse("note-1").unwrap())
            .await
            .unwrap();
        assert_eq!(stored.field("title"), Some(&serde_json::json!("v2")));
    }

    #[tokio::test]
    async fn remove_returns_snapshot() {
        let store = InMemoryStore::new();
        let notes = CollectionName::parse("notes").unwrap();
        store.upsert(&notes, resource("note-1")).await;

        let removed = store
            .remove(&notes, &ResourceId::parse("note-1").unwrap())
            .await;
        assert!(removed.is_some());
        assert_eq!(store.len(&notes).await, 0);
        assert!(store
            .remove(&notes, &ResourceId::parse("note-1").unwrap())
            .await
            .is_none());
    }
}
