#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lorebase_sync::{
    ChangeProbe, CollectionName, ContentCache, CredentialProvider, OwnerId, Resource,
    ResourceBackend, ResourceId, SyncError,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

pub fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn resource(id: &str, owner: &str, field_pairs: &[(&str, Value)]) -> Resource {
    Resource::new(
        ResourceId::parse(id).unwrap(),
        OwnerId::parse(owner).unwrap(),
        fields(field_pairs),
    )
}

pub fn resource_at(
    id: &str,
    owner: &str,
    field_pairs: &[(&str, Value)],
    modified_at: DateTime<Utc>,
) -> Resource {
    let mut resource = resource(id, owner, field_pairs);
    resource.created_at = modified_at;
    resource.updated_at = Some(modified_at);
    resource
}

/// Scripted backend double. Responses are queued per method (per
/// collection for the query methods) and popped call by call; calls are
/// recorded for assertions.
#[derive(Default)]
pub struct MockBackend {
    pub create_results: Mutex<VecDeque<Result<Resource, SyncError>>>,
    pub update_results: Mutex<VecDeque<Result<Resource, SyncError>>>,
    pub delete_results: Mutex<VecDeque<Result<(), SyncError>>>,
    pub counts: Mutex<HashMap<String, VecDeque<Result<u64, SyncError>>>>,
    pub updated_since: Mutex<HashMap<String, VecDeque<Vec<Resource>>>>,
    pub newest: Mutex<HashMap<String, VecDeque<Vec<Resource>>>>,

    pub create_calls: Mutex<Vec<(String, Map<String, Value>)>>,
    pub update_calls: Mutex<Vec<(String, Map<String, Value>)>>,
    pub delete_calls: Mutex<Vec<String>>,
    pub list_calls: Mutex<Vec<(String, DateTime<Utc>, u32)>>,
    pub newest_calls: Mutex<Vec<(String, u32)>>,

    /// Gates awaited (in push order) by `update` before answering,
    /// letting tests hold a mutation in flight.
    pub update_gates: Mutex<VecDeque<Arc<Notify>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_update(&self, result: Result<Resource, SyncError>) {
        self.update_results.lock().await.push_back(result);
    }

    pub async fn script_create(&self, result: Result<Resource, SyncError>) {
        self.create_results.lock().await.push_back(result);
    }

    pub async fn script_delete(&self, result: Result<(), SyncError>) {
        self.delete_results.lock().await.push_back(result);
    }

    pub async fn script_count(&self, collection: &str, result: Result<u64, SyncError>) {
        self.counts
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push_back(result);
    }

    pub async fn script_updated_since(&self, collection: &str, resources: Vec<Resource>) {
        self.updated_since
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push_back(resources);
    }

    pub async fn script_newest(&self, collection: &str, resources: Vec<Resource>) {
        self.newest
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push_back(resources);
    }

    pub async fn push_update_gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.update_gates.lock().await.push_back(gate.clone());
        gate
    }

    /// Poll until `update` has been called `n` times.
    pub async fn wait_for_update_calls(&self, n: usize) {
        for _ in 0..200 {
            if self.update_calls.lock().await.len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("Timed out waiting for {n} update calls");
    }

    /// Echo the changed fields back as the server-authoritative resource.
    fn echo_update(id: &ResourceId, changed_fields: &Map<String, Value>) -> Resource {
        let mut resource = Resource::new(
            id.clone(),
            OwnerId::parse("user-1").unwrap(),
            changed_fields.clone(),
        );
        resource.updated_at = Some(Utc::now());
        resource
    }
}

#[async_trait]
impl ResourceBackend for MockBackend {
    async fn create(
        &self,
        _collection: &CollectionName,
        _owner: &OwnerId,
        fields: &Map<String, Value>,
    ) -> Result<Resource, SyncError> {
        self.create_calls
            .lock()
            .await
            .push(("create".to_string(), fields.clone()));
        self.create_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::internal("Unscripted create call")))
    }

    async fn update(
        &self,
        _collection: &CollectionName,
        id: &ResourceId,
        changed_fields: &Map<String, Value>,
    ) -> Result<Resource, SyncError> {
        self.update_calls
            .lock()
            .await
            .push((id.to_string(), changed_fields.clone()));
        let gate = self.update_gates.lock().await.pop_front();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.update_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Self::echo_update(id, changed_fields)))
    }

    async fn delete(
        &self,
        _collection: &CollectionName,
        id: &ResourceId,
    ) -> Result<(), SyncError> {
        self.delete_calls.lock().await.push(id.to_string());
        self.delete_results
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn list_updated_since(
        &self,
        collection: &CollectionName,
        _owner: &OwnerId,
        after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Resource>, SyncError> {
        self.list_calls
            .lock()
            .await
            .push((collection.to_string(), after, limit));
        Ok(self
            .updated_since
            .lock()
            .await
            .get_mut(collection.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }

    async fn list_newest(
        &self,
        collection: &CollectionName,
        _owner: &OwnerId,
        limit: u32,
    ) -> Result<Vec<Resource>, SyncError> {
        self.newest_calls
            .lock()
            .await
            .push((collection.to_string(), limit));
        Ok(self
            .newest
            .lock()
            .await
            .get_mut(collection.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }

    async fn count(
        &self,
        collection: &CollectionName,
        _owner: &OwnerId,
    ) -> Result<u64, SyncError> {
        self.counts
            .lock()
            .await
            .get_mut(collection.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(SyncError::internal("Unscripted count call")))
    }
}

/// Records immediate-check requests from the coordinator.
#[derive(Default)]
pub struct RecordingProbe {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ChangeProbe for RecordingProbe {
    async fn trigger_immediate_check(&self, collection: &CollectionName) {
        self.calls.lock().await.push(collection.to_string());
    }
}

/// Records cache invalidations from the coordinator.
#[derive(Default)]
pub struct RecordingCache {
    pub invalidated: Mutex<Vec<String>>,
}

#[async_trait]
impl ContentCache for RecordingCache {
    async fn invalidate(&self, id: &ResourceId) {
        self.invalidated.lock().await.push(id.to_string());
    }
}

/// Fixed-token session provider; `None` simulates a missing credential.
pub struct StaticCredentials(pub Option<String>);

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<String, SyncError> {
        self.0
            .clone()
            .ok_or_else(|| SyncError::credential("No active session"))
    }
}
