use crate::domain::entities::Resource;
use crate::domain::value_objects::{CollectionName, OwnerId, ResourceId};
use crate::shared::error::SyncError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Generic per-resource-type backend contract the engine syncs against.
///
/// `list_updated_since` and `list_newest` return items ordered
/// newest-first; `count` is exact for the owner's scope.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    async fn create(
        &self,
        collection: &CollectionName,
        owner: &OwnerId,
        fields: &Map<String, Value>,
    ) -> Result<Resource, SyncError>;

    /// Partial update carrying only the explicitly changed fields. The
    /// returned resource is server-authoritative.
    async fn update(
        &self,
        collection: &CollectionName,
        id: &ResourceId,
        changed_fields: &Map<String, Value>,
    ) -> Result<Resource, SyncError>;

    async fn delete(&self, collection: &CollectionName, id: &ResourceId)
        -> Result<(), SyncError>;

    async fn list_updated_since(
        &self,
        collection: &CollectionName,
        owner: &OwnerId,
        after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Resource>, SyncError>;

    async fn list_newest(
        &self,
        collection: &CollectionName,
        owner: &OwnerId,
        limit: u32,
    ) -> Result<Vec<Resource>, SyncError>;

    async fn count(&self, collection: &CollectionName, owner: &OwnerId)
        -> Result<u64, SyncError>;
}
