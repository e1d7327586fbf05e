use crate::domain::value_objects::CollectionName;
use async_trait::async_trait;

/// Low-latency confirmation seam: the mutation coordinator asks the
/// change source to look at a collection right now, outside the normal
/// cadence. Implementations absorb their own failures; a mutation never
/// fails because a follow-up check did.
#[async_trait]
pub trait ChangeProbe: Send + Sync {
    async fn trigger_immediate_check(&self, collection: &CollectionName);
}
