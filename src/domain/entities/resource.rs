use crate::domain::value_objects::{OwnerId, ResourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A versioned record owned by the local store.
///
/// Exactly one canonical in-memory copy exists per id at any time; the
/// store is the single source of truth and only the mutation coordinator
/// and the change poller write to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub owner: OwnerId,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource {
    /// Conventional content-bearing field name.
    pub const CONTENT_FIELD: &'static str = "content";

    pub fn new(id: ResourceId, owner: OwnerId, fields: Map<String, Value>) -> Self {
        Self {
            id,
            owner,
            fields,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn content(&self) -> Option<&str> {
        self.fields.get(Self::CONTENT_FIELD).and_then(Value::as_str)
    }

    /// Merge a patch onto this resource. Fields absent from the patch keep
    /// their last known value.
    pub fn merge_fields(&mut self, patch: &Map<String, Value>) {
        for (name, value) in patch {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}
