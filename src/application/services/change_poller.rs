use crate::application::ports::{ChangeProbe, LocalStore, ResourceBackend};
use crate::application::services::DiffEngine;
use crate::domain::entities::{ChangeEvent, CollectionCursor};
use crate::domain::value_objects::{CollectionName, OwnerId, ResourceId};
use crate::shared::config::PollConfig;
use crate::shared::error::SyncError;
use crate::shared::metrics::{EventCounter, OutcomeMetric};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Point-in-time view of the poller's counters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PollerStatus {
    pub watched_collections: usize,
    pub checks_succeeded: u64,
    pub checks_failed: u64,
    pub events_emitted: u64,
    pub throttled_checks: u64,
    pub last_check_ms: Option<u64>,
}

/// Receiver half of a collection subscription. Dropping it unsubscribes.
pub struct ChangeSubscription {
    collection: CollectionName,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    /// Next change event, or `None` once the poller is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        collection = %self.collection,
                        skipped,
                        "Subscriber lagged behind change events"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain one already-buffered event without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

struct WatchState {
    cursor: CollectionCursor,
    sender: broadcast::Sender<ChangeEvent>,
    last_immediate: Option<Instant>,
}

/// Infers remote inserts, updates and deletes for watched collections by
/// comparing per-collection snapshots, without a push channel.
///
/// Each poll tick runs two sub-checks per collection: a delta query for
/// content updates (annotated with a scored diff where available) and an
/// exact count comparison for structural changes. A failure in one
/// collection is logged and never prevents the others from polling.
pub struct ChangeDetectionPoller {
    backend: Arc<dyn ResourceBackend>,
    store: Arc<dyn LocalStore>,
    diff: Arc<DiffEngine>,
    owner: OwnerId,
    config: PollConfig,
    watches: RwLock<HashMap<CollectionName, WatchState>>,
    checks: OutcomeMetric,
    events: EventCounter,
    throttled: EventCounter,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeDetectionPoller {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        store: Arc<dyn LocalStore>,
        diff: Arc<DiffEngine>,
        owner: OwnerId,
        config: PollConfig,
    ) -> Self {
        Self {
            backend,
            store,
            diff,
            owner,
            config,
            watches: RwLock::new(HashMap::new()),
            checks: OutcomeMetric::new(),
            events: EventCounter::new(),
            throttled: EventCounter::new(),
            poll_task: Mutex::new(None),
        }
    }

    /// Register a collection for polling. Idempotent.
    pub async fn watch(&self, collection: &str) -> Result<(), SyncError> {
        let collection = CollectionName::parse(collection).map_err(SyncError::Validation)?;
        let mut watches = self.watches.write().await;
        self.ensure_watch(&mut watches, collection);
        Ok(())
    }

    /// Subscribe to a collection's change events, watching it if needed.
    pub async fn subscribe(&self, collection: &str) -> Result<ChangeSubscription, SyncError> {
        let collection = CollectionName::parse(collection).map_err(SyncError::Validation)?;
        let mut watches = self.watches.write().await;
        let state = self.ensure_watch(&mut watches, collection.clone());
        Ok(ChangeSubscription {
            collection,
            receiver: state.sender.subscribe(),
        })
    }

    fn ensure_watch<'a>(
        &self,
        watches: &'a mut HashMap<CollectionName, WatchState>,
        collection: CollectionName,
    ) -> &'a mut WatchState {
        watches.entry(collection).or_insert_with(|| WatchState {
            cursor: CollectionCursor::unprimed(),
            sender: broadcast::channel(self.config.event_buffer).0,
            last_immediate: None,
        })
    }

    /// Poll every watched collection once. One collection's failure is
    /// recorded and logged but does not halt the others.
    pub async fn run_once(&self) {
        let collections: Vec<CollectionName> =
            self.watches.read().await.keys().cloned().collect();
        for collection in collections {
            match self.check_collection(&collection).await {
                Ok(()) => self.checks.record_success(),
                Err(error) => {
                    self.checks.record_failure();
                    tracing::error!(collection = %collection, error = %error, "Poll failed");
                }
            }
        }
    }

    /// Run both sub-checks for one collection right now, outside the
    /// normal cadence. Used by the mutation coordinator for low-latency
    /// confirmation; bursts against one collection are throttled.
    pub async fn trigger_immediate_check(&self, collection: &CollectionName) {
        let spacing = Duration::from_millis(self.config.min_immediate_spacing_ms);
        {
            let mut watches = self.watches.write().await;
            let Some(state) = watches.get_mut(collection) else {
                tracing::debug!(
                    collection = %collection,
                    "Immediate check for unwatched collection ignored"
                );
                return;
            };
            if let Some(last) = state.last_immediate {
                if last.elapsed() < spacing {
                    self.throttled.incr();
                    tracing::debug!(collection = %collection, "Immediate check throttled");
                    return;
                }
            }
            state.last_immediate = Some(Instant::now());
        }

        match self.check_collection(collection).await {
            Ok(()) => self.checks.record_success(),
            Err(error) => {
                self.checks.record_failure();
                tracing::error!(
                    collection = %collection,
                    error = %error,
                    "Immediate check failed"
                );
            }
        }
    }

    /// Start polling on a fixed cadence. No-op when already scheduled.
    pub async fn schedule(self: &Arc<Self>, interval: Duration) {
        let mut task = self.poll_task.lock().await;
        if task.is_some() {
            return;
        }
        let poller = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                poller.run_once().await;
            }
        }));
    }

    pub async fn stop(&self) {
        if let Some(task) = self.poll_task.lock().await.take() {
            task.abort();
        }
    }

    pub async fn status(&self) -> PollerStatus {
        let checks = self.checks.snapshot();
        PollerStatus {
            watched_collections: self.watches.read().await.len(),
            checks_succeeded: checks.successes,
            checks_failed: checks.failures,
            events_emitted: self.events.get(),
            throttled_checks: self.throttled.get(),
            last_check_ms: checks
                .last_success_ms
                .into_iter()
                .chain(checks.last_failure_ms)
                .max(),
        }
    }

    async fn check_collection(&self, collection: &CollectionName) -> Result<(), SyncError> {
        let cursor = {
            let watches = self.watches.read().await;
            let state = watches.get(collection).ok_or_else(|| {
                SyncError::validation(format!("Collection is not watched: {collection}"))
            })?;
            state.cursor.clone()
        };

        let observed_count = self.backend.count(collection, &self.owner).await?;

        // First poll only establishes the baseline.
        if !cursor.primed {
            let mut watches = self.watches.write().await;
            if let Some(state) = watches.get_mut(collection) {
                state.cursor.baseline(Utc::now(), observed_count);
            }
            tracing::debug!(
                collection = %collection,
                count = observed_count,
                "Baselined collection cursor"
            );
            return Ok(());
        }

        let mut next_cursor = cursor.clone();
        let mut inserted_ids: HashSet<ResourceId> = HashSet::new();
        let mut events: Vec<ChangeEvent> = Vec::new();

        // Structural-change check.
        if observed_count > cursor.last_seen_count {
            let delta = observed_count - cursor.last_seen_count;
            let newest = self
                .backend
                .list_newest(collection, &self.owner, delta.min(u64::from(u32::MAX)) as u32)
                .await?;
            for resource in newest.into_iter().take(delta as usize) {
                next_cursor.advance(resource.last_modified());
                inserted_ids.insert(resource.id.clone());
                if let Some(content) = resource.content() {
                    // Seed the diff baseline so the first later edit diffs
                    // against the inserted content.
                    self.diff.generate_diff(&resource.id, content);
                }
                self.store.upsert(collection, resource.clone()).await;
                events.push(ChangeEvent::inserted(collection.clone(), resource));
            }
        } else if observed_count < cursor.last_seen_count {
            // The identity of removed items is not recoverable from a
            // count; subscribers re-fetch if they need specifics.
            events.push(ChangeEvent::removed(
                collection.clone(),
                cursor.last_seen_count - observed_count,
            ));
        }

        // Content-update check.
        let updated = self
            .backend
            .list_updated_since(
                collection,
                &self.owner,
                cursor.last_seen,
                self.config.page_size,
            )
            .await?;
        for resource in updated {
            next_cursor.advance(resource.last_modified());
            if inserted_ids.contains(&resource.id) {
                continue;
            }
            let diff = resource
                .content()
                .and_then(|content| self.diff.generate_diff(&resource.id, content));
            self.store.upsert(collection, resource.clone()).await;
            events.push(ChangeEvent::updated(collection.clone(), resource, diff));
        }

        next_cursor.last_seen_count = observed_count;

        let mut emitted = 0u64;
        {
            let mut watches = self.watches.write().await;
            if let Some(state) = watches.get_mut(collection) {
                // Merge monotonically in case another check of the same
                // collection finished while this one was in flight.
                state.cursor.advance(next_cursor.last_seen);
                state.cursor.last_seen_count = next_cursor.last_seen_count;
                state.cursor.primed = true;
                for event in events {
                    let _ = state.sender.send(event);
                    emitted += 1;
                }
            }
        }
        self.events.incr_by(emitted);

        Ok(())
    }
}

#[async_trait]
impl ChangeProbe for ChangeDetectionPoller {
    async fn trigger_immediate_check(&self, collection: &CollectionName) {
        ChangeDetectionPoller::trigger_immediate_check(self, collection).await;
    }
}
