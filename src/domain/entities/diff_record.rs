use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Added,
    Removed,
}

/// One contiguous run of added or removed words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedSpan {
    pub kind: SpanKind,
    pub text: String,
    /// Word offset of the span: into the new content for additions, into
    /// the previous content for removals.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn classify(span_count: usize) -> Self {
        match span_count {
            0..=5 => SizeClass::Small,
            6..=20 => SizeClass::Medium,
            _ => SizeClass::Large,
        }
    }
}

/// A scored content diff. Only produced when the change is meaningful
/// enough to surface; low-confidence diffs are suppressed at the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    pub spans: Vec<ChangedSpan>,
    pub added_units: usize,
    pub removed_units: usize,
    /// Normalized edit distance between the two versions, in [0, 1].
    pub change_ratio: f64,
    /// Reliability of this diff for presentation, in [0, 1].
    pub confidence: f64,
    pub size_class: SizeClass,
    pub computed_at: DateTime<Utc>,
}
