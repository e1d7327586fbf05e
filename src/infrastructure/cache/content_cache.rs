use crate::application::ports::ContentCache;
use crate::domain::value_objects::ResourceId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
struct CacheEntry {
    data: String,
    expires_at: Instant,
}

/// TTL cache for derived content (rendered previews, extracts) keyed by
/// resource id. Mutations invalidate entries through the `ContentCache`
/// port; expired entries are dropped lazily on read.
pub struct MemoryContentCache {
    entries: Arc<RwLock<HashMap<ResourceId, CacheEntry>>>,
    ttl: Duration,
}

impl MemoryContentCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub async fn set(&self, id: ResourceId, data: String) {
        let entry = CacheEntry {
            data,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(id, entry);
    }

    pub async fn get(&self, id: &ResourceId) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(id).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.data.clone())
            } else {
                None
            }
        })
    }

    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ContentCache for MemoryContentCache {
    async fn invalidate(&self, id: &ResourceId) {
        self.entries.write().await.remove(id);
    }
}
