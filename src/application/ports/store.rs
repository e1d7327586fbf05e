use crate::domain::entities::Resource;
use crate::domain::value_objects::{CollectionName, ResourceId};
use async_trait::async_trait;

/// The local store holding the canonical in-memory copy of every resource.
///
/// Joint writers are the mutation coordinator and the change poller; no
/// other component writes resources.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, collection: &CollectionName, id: &ResourceId) -> Option<Resource>;

    async fn upsert(&self, collection: &CollectionName, resource: Resource);

    async fn remove(&self, collection: &CollectionName, id: &ResourceId) -> Option<Resource>;

    async fn len(&self, collection: &CollectionName) -> usize;
}
