use chrono::{DateTime, TimeZone, Utc};

/// Per-collection poll bookmark. Never persisted: the first poll after a
/// restart only baselines the cursor and emits nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionCursor {
    pub last_seen: DateTime<Utc>,
    pub last_seen_count: u64,
    pub primed: bool,
}

impl CollectionCursor {
    pub fn unprimed() -> Self {
        Self {
            last_seen: Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now),
            last_seen_count: 0,
            primed: false,
        }
    }

    pub fn baseline(&mut self, now: DateTime<Utc>, count: u64) {
        self.last_seen = now;
        self.last_seen_count = count;
        self.primed = true;
    }

    /// Monotonic: the bookmark never moves backwards.
    pub fn advance(&mut self, seen: DateTime<Utc>) {
        if seen > self.last_seen {
            self.last_seen = seen;
        }
    }
}
