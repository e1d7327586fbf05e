use crate::domain::entities::Resource;
use crate::domain::value_objects::ResourceId;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A pending mutation: the pre-mutation snapshot plus the proposed fields.
///
/// Lifecycle: created when a mutation starts, the optimistic view is
/// written to the store immediately, and the patch resolves to either
/// reconciliation (server-authoritative fields re-applied) or rollback
/// (snapshot restored verbatim). Dropped once resolved.
#[derive(Debug, Clone)]
pub struct OptimisticPatch {
    pub patch_id: Uuid,
    pub resource_id: ResourceId,
    pub previous_snapshot: Resource,
    pub proposed_fields: Map<String, Value>,
    pub issued_at: DateTime<Utc>,
}

impl OptimisticPatch {
    pub fn new(
        resource_id: ResourceId,
        previous_snapshot: Resource,
        proposed_fields: Map<String, Value>,
    ) -> Self {
        Self {
            patch_id: Uuid::new_v4(),
            resource_id,
            previous_snapshot,
            proposed_fields,
            issued_at: Utc::now(),
        }
    }

    /// The merged view written to the store before the backend confirms.
    /// Fields omitted from the patch retain their last known value.
    pub fn optimistic_view(&self) -> Resource {
        let mut view = self.previous_snapshot.clone();
        view.merge_fields(&self.proposed_fields);
        view.updated_at = Some(self.issued_at);
        view
    }
}
