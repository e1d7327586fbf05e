use crate::domain::value_objects::ResourceId;
use async_trait::async_trait;

/// Downstream cache of derived content (rendered previews, extracts)
/// keyed by resource id. The coordinator invalidates entries after every
/// successful mutation.
#[async_trait]
pub trait ContentCache: Send + Sync {
    async fn invalidate(&self, id: &ResourceId);
}
