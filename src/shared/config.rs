use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub backend: BackendConfig,
    pub poll: PollConfig,
    pub diff: DiffConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_secs: u64,
    /// Backpressure bound on the delta query.
    pub page_size: u32,
    /// Minimum spacing between immediate checks of one collection.
    pub min_immediate_spacing_ms: u64,
    /// Broadcast buffer per watched collection.
    pub event_buffer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    pub max_spans: usize,
    pub min_confidence: f64,
    /// Above this change ratio the diff is not characterized at all.
    pub large_change_ratio: f64,
    /// Above this change ratio the span list is capped at `max_spans`.
    pub capped_span_ratio: f64,
    /// Spans longer than this many characters are rejected as noise.
    pub max_span_units: usize,
    pub history_depth: usize,
    pub baseline_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub content_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://localhost:8787/api".to_string(),
                request_timeout_secs: 30,
            },
            poll: PollConfig {
                interval_secs: 60,
                page_size: 50,
                min_immediate_spacing_ms: 500,
                event_buffer: 256,
            },
            diff: DiffConfig {
                max_spans: 50,
                min_confidence: 0.3,
                large_change_ratio: 0.8,
                capped_span_ratio: 0.5,
                max_span_units: 1000,
                history_depth: 5,
                baseline_capacity: 512,
            },
            cache: CacheConfig {
                content_ttl_secs: 300, // 5 minutes
            },
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("LOREBASE_BACKEND_URL") {
            if !v.trim().is_empty() {
                cfg.backend.base_url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("LOREBASE_REQUEST_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.backend.request_timeout_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("LOREBASE_POLL_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.poll.interval_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("LOREBASE_POLL_PAGE_SIZE") {
            if let Some(value) = parse_u64(&v) {
                cfg.poll.page_size = (value.clamp(1, u64::from(u32::MAX))) as u32;
            }
        }
        if let Ok(v) = std::env::var("LOREBASE_IMMEDIATE_SPACING_MS") {
            if let Some(value) = parse_u64(&v) {
                cfg.poll.min_immediate_spacing_ms = value;
            }
        }
        if let Ok(v) = std::env::var("LOREBASE_DIFF_MIN_CONFIDENCE") {
            if let Some(value) = parse_f64(&v) {
                cfg.diff.min_confidence = value.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("LOREBASE_CONTENT_TTL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.content_ttl_secs = value.max(1);
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.backend.base_url.trim().is_empty() {
            return Err("Backend base_url must not be empty".to_string());
        }
        if self.backend.request_timeout_secs == 0 {
            return Err("Backend request_timeout_secs must be greater than 0".to_string());
        }
        if self.poll.page_size == 0 {
            return Err("Poll page_size must be greater than 0".to_string());
        }
        if self.poll.event_buffer == 0 {
            return Err("Poll event_buffer must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.diff.min_confidence) {
            return Err("Diff min_confidence must lie in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.diff.large_change_ratio) {
            return Err("Diff large_change_ratio must lie in [0, 1]".to_string());
        }
        if self.diff.max_spans == 0 {
            return Err("Diff max_spans must be greater than 0".to_string());
        }
        if self.diff.history_depth == 0 {
            return Err("Diff history_depth must be greater than 0".to_string());
        }
        if self.diff.baseline_capacity == 0 {
            return Err("Diff baseline_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}
