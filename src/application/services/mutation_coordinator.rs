use crate::application::ports::{ChangeProbe, ContentCache, LocalStore, ResourceBackend};
use crate::domain::entities::{OptimisticPatch, Resource};
use crate::domain::value_objects::{CollectionName, OwnerId, ResourceId};
use crate::shared::error::SyncError;
use crate::shared::metrics::{OutcomeMetric, OutcomeSnapshot};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Successful mutation: the reconciled resource plus timing.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub resource: Resource,
    pub elapsed: Duration,
    /// Field names the server answered differently than the optimistic
    /// view proposed.
    pub reconciled_fields: Vec<String>,
}

/// Successful removal.
#[derive(Debug, Clone)]
pub struct RemovalOutcome {
    pub elapsed: Duration,
}

/// Failed mutation. `rolled_back` is false only for validation-class
/// failures, which perform no optimistic write.
#[derive(Debug)]
pub struct MutationError {
    pub error: SyncError,
    pub elapsed: Duration,
    pub rolled_back: bool,
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mutation failed after {:?}: {}", self.elapsed, self.error)
    }
}

impl std::error::Error for MutationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Applies local writes before server confirmation and reconciles or
/// rolls them back afterwards.
///
/// Every outcome is a `Result`; nothing escapes this boundary as a
/// panic. Concurrent mutations to the same resource are not serialized:
/// the mutation whose backend call settles last determines the stored
/// state (last writer wins).
pub struct MutationCoordinator {
    backend: Arc<dyn ResourceBackend>,
    store: Arc<dyn LocalStore>,
    probe: Arc<dyn ChangeProbe>,
    content_cache: Arc<dyn ContentCache>,
    metrics: OutcomeMetric,
}

impl MutationCoordinator {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        store: Arc<dyn LocalStore>,
        probe: Arc<dyn ChangeProbe>,
        content_cache: Arc<dyn ContentCache>,
    ) -> Self {
        Self {
            backend,
            store,
            probe,
            content_cache,
            metrics: OutcomeMetric::new(),
        }
    }

    /// Optimistically apply `proposed_fields` to a stored resource, then
    /// confirm against the backend.
    ///
    /// The optimistic view is written to the store before the network
    /// round trip; fields omitted from the patch keep their last known
    /// value. On success only server-divergent fields are re-applied; on
    /// any failure the pre-mutation snapshot is restored verbatim.
    pub async fn mutate(
        &self,
        collection: &str,
        resource_id: &str,
        proposed_fields: Map<String, Value>,
    ) -> Result<MutationOutcome, MutationError> {
        let started = Instant::now();

        let collection = CollectionName::parse(collection)
            .map_err(|reason| self.reject(reason, started))?;
        let id =
            ResourceId::parse(resource_id).map_err(|reason| self.reject(reason, started))?;

        let Some(current) = self.store.get(&collection, &id).await else {
            return Err(self.reject(format!("Unknown resource: {id}"), started));
        };

        let patch = OptimisticPatch::new(id.clone(), current, proposed_fields);
        let optimistic = patch.optimistic_view();
        self.store.upsert(&collection, optimistic.clone()).await;

        match self
            .backend
            .update(&collection, &id, &patch.proposed_fields)
            .await
        {
            Ok(server) => {
                let (merged, reconciled_fields) = Self::reconcile(&optimistic, &server);
                self.store.upsert(&collection, merged.clone()).await;
                self.content_cache.invalidate(&id).await;
                self.probe.trigger_immediate_check(&collection).await;
                self.metrics.record_success();
                tracing::debug!(
                    resource_id = %id,
                    reconciled = reconciled_fields.len(),
                    "Mutation reconciled"
                );
                Ok(MutationOutcome {
                    resource: merged,
                    elapsed: started.elapsed(),
                    reconciled_fields,
                })
            }
            Err(error) => {
                self.store
                    .upsert(&collection, patch.previous_snapshot.clone())
                    .await;
                self.metrics.record_failure();
                tracing::warn!(
                    resource_id = %id,
                    error = %error,
                    "Mutation failed, rolled back optimistic write"
                );
                Err(MutationError {
                    error,
                    elapsed: started.elapsed(),
                    rolled_back: true,
                })
            }
        }
    }

    /// Create a resource. Ids are server-assigned, so creation is plain
    /// request/response; the created resource enters the store once the
    /// backend confirms it.
    pub async fn create(
        &self,
        collection: &str,
        owner: &str,
        fields: Map<String, Value>,
    ) -> Result<MutationOutcome, MutationError> {
        let started = Instant::now();

        let collection = CollectionName::parse(collection)
            .map_err(|reason| self.reject(reason, started))?;
        let owner = OwnerId::parse(owner).map_err(|reason| self.reject(reason, started))?;

        match self.backend.create(&collection, &owner, &fields).await {
            Ok(created) => {
                self.store.upsert(&collection, created.clone()).await;
                self.probe.trigger_immediate_check(&collection).await;
                self.metrics.record_success();
                Ok(MutationOutcome {
                    resource: created,
                    elapsed: started.elapsed(),
                    reconciled_fields: Vec::new(),
                })
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::warn!(collection = %collection, error = %error, "Create failed");
                Err(MutationError {
                    error,
                    elapsed: started.elapsed(),
                    rolled_back: false,
                })
            }
        }
    }

    /// Optimistically remove a resource, restoring the removed snapshot
    /// if the backend rejects the deletion.
    pub async fn delete(
        &self,
        collection: &str,
        resource_id: &str,
    ) -> Result<RemovalOutcome, MutationError> {
        let started = Instant::now();

        let collection = CollectionName::parse(collection)
            .map_err(|reason| self.reject(reason, started))?;
        let id =
            ResourceId::parse(resource_id).map_err(|reason| self.reject(reason, started))?;

        let Some(snapshot) = self.store.remove(&collection, &id).await else {
            return Err(self.reject(format!("Unknown resource: {id}"), started));
        };

        match self.backend.delete(&collection, &id).await {
            Ok(()) => {
                self.content_cache.invalidate(&id).await;
                self.probe.trigger_immediate_check(&collection).await;
                self.metrics.record_success();
                Ok(RemovalOutcome {
                    elapsed: started.elapsed(),
                })
            }
            Err(error) => {
                self.store.upsert(&collection, snapshot).await;
                self.metrics.record_failure();
                tracing::warn!(
                    resource_id = %id,
                    error = %error,
                    "Delete failed, restored optimistic removal"
                );
                Err(MutationError {
                    error,
                    elapsed: started.elapsed(),
                    rolled_back: true,
                })
            }
        }
    }

    pub fn metrics(&self) -> OutcomeSnapshot {
        self.metrics.snapshot()
    }

    /// Merge the server's answer onto the optimistic view, touching only
    /// the fields the server reports differently. Fields absent from the
    /// server response keep their optimistic value.
    fn reconcile(optimistic: &Resource, server: &Resource) -> (Resource, Vec<String>) {
        let mut merged = optimistic.clone();
        let mut reconciled_fields = Vec::new();

        for (name, value) in &server.fields {
            if merged.fields.get(name) != Some(value) {
                merged.fields.insert(name.clone(), value.clone());
                reconciled_fields.push(name.clone());
            }
        }
        merged.created_at = server.created_at;
        if server.updated_at.is_some() {
            merged.updated_at = server.updated_at;
        }

        (merged, reconciled_fields)
    }

    fn reject(&self, reason: impl Into<String>, started: Instant) -> MutationError {
        self.metrics.record_failure();
        MutationError {
            error: SyncError::validation(reason),
            elapsed: started.elapsed(),
            rolled_back: false,
        }
    }
}
