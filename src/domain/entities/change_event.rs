use crate::domain::entities::{DiffRecord, Resource};
use crate::domain::value_objects::CollectionName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind-specific payload of a detected remote change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Inserted {
        resource: Resource,
    },
    Updated {
        resource: Resource,
        diff: Option<DiffRecord>,
    },
    /// A count decrease. The identity of the removed item(s) is not
    /// recoverable from a count comparison; subscribers that need
    /// specifics must re-fetch the list.
    Removed {
        count_delta: u64,
    },
}

/// Immutable event emitted by the change poller to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: CollectionName,
    pub observed_at: DateTime<Utc>,
    pub change: Change,
}

impl ChangeEvent {
    pub fn inserted(collection: CollectionName, resource: Resource) -> Self {
        Self {
            collection,
            observed_at: Utc::now(),
            change: Change::Inserted { resource },
        }
    }

    pub fn updated(
        collection: CollectionName,
        resource: Resource,
        diff: Option<DiffRecord>,
    ) -> Self {
        Self {
            collection,
            observed_at: Utc::now(),
            change: Change::Updated { resource, diff },
        }
    }

    pub fn removed(collection: CollectionName, count_delta: u64) -> Self {
        Self {
            collection,
            observed_at: Utc::now(),
            change: Change::Removed { count_delta },
        }
    }
}
