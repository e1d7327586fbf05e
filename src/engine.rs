use crate::application::ports::{
    ChangeProbe, CredentialProvider, LocalStore, ResourceBackend,
};
use crate::application::services::{
    ChangeDetectionPoller, ChangeSubscription, DiffEngine, MutationCoordinator, MutationError,
    MutationOutcome, OperationDeduplicator,
};
use crate::domain::value_objects::{CollectionName, Fingerprint, OwnerId};
use crate::infrastructure::api::RestBackend;
use crate::infrastructure::cache::MemoryContentCache;
use crate::infrastructure::store::InMemoryStore;
use crate::shared::config::EngineConfig;
use crate::shared::error::SyncError;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Explicitly constructed engine context: wires the store, diff engine,
/// poller and mutation coordinator together, with caller-controlled
/// lifecycle. There are no module-level singletons; drop the engine (or
/// call [`shutdown`](Self::shutdown)) to tear everything down.
pub struct SyncEngine {
    config: EngineConfig,
    store: Arc<InMemoryStore>,
    content_cache: Arc<MemoryContentCache>,
    diff: Arc<DiffEngine>,
    poller: Arc<ChangeDetectionPoller>,
    coordinator: Arc<MutationCoordinator>,
    operations: OperationDeduplicator<Value>,
}

impl SyncEngine {
    /// Build an engine talking to the configured REST backend.
    pub fn new(
        config: EngineConfig,
        owner: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, SyncError> {
        let backend: Arc<dyn ResourceBackend> =
            Arc::new(RestBackend::new(&config.backend, credentials)?);
        Self::with_backend(config, owner, backend)
    }

    /// Build an engine over any backend implementation.
    pub fn with_backend(
        config: EngineConfig,
        owner: &str,
        backend: Arc<dyn ResourceBackend>,
    ) -> Result<Self, SyncError> {
        config.validate().map_err(SyncError::Validation)?;
        let owner = OwnerId::parse(owner).map_err(SyncError::Validation)?;

        let store = Arc::new(InMemoryStore::new());
        let store_port: Arc<dyn LocalStore> = store.clone();
        let content_cache = Arc::new(MemoryContentCache::new(config.cache.content_ttl_secs));
        let diff = Arc::new(DiffEngine::new(config.diff.clone()));
        let poller = Arc::new(ChangeDetectionPoller::new(
            backend.clone(),
            store_port.clone(),
            diff.clone(),
            owner,
            config.poll.clone(),
        ));
        let probe: Arc<dyn ChangeProbe> = poller.clone();
        let coordinator = Arc::new(MutationCoordinator::new(
            backend,
            store_port,
            probe,
            content_cache.clone(),
        ));

        Ok(Self {
            config,
            store,
            content_cache,
            diff,
            poller,
            coordinator,
            operations: OperationDeduplicator::new(),
        })
    }

    /// Start the polling loop at the configured cadence.
    pub async fn start(&self) {
        self.poller
            .schedule(Duration::from_secs(self.config.poll.interval_secs))
            .await;
    }

    pub async fn shutdown(&self) {
        self.poller.stop().await;
    }

    pub async fn mutate(
        &self,
        collection: &str,
        resource_id: &str,
        proposed_fields: Map<String, Value>,
    ) -> Result<MutationOutcome, MutationError> {
        self.coordinator
            .mutate(collection, resource_id, proposed_fields)
            .await
    }

    pub async fn subscribe(&self, collection: &str) -> Result<ChangeSubscription, SyncError> {
        self.poller.subscribe(collection).await
    }

    pub async fn trigger_immediate_check(&self, collection: &str) -> Result<(), SyncError> {
        let collection = CollectionName::parse(collection).map_err(SyncError::Validation)?;
        self.poller.trigger_immediate_check(&collection).await;
        Ok(())
    }

    /// Collapse concurrent identical operations onto one in-flight call.
    pub async fn dedupe<F, Fut>(
        &self,
        fingerprint: Fingerprint,
        factory: F,
    ) -> Result<Value, Arc<SyncError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, SyncError>> + Send + 'static,
    {
        self.operations.dedupe(fingerprint, factory).await
    }

    pub fn coordinator(&self) -> &Arc<MutationCoordinator> {
        &self.coordinator
    }

    pub fn poller(&self) -> &Arc<ChangeDetectionPoller> {
        &self.poller
    }

    pub fn diff(&self) -> &Arc<DiffEngine> {
        &self.diff
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn content_cache(&self) -> &Arc<MemoryContentCache> {
        &self.content_cache
    }
}
