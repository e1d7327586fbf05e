use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Write as _;

/// Deterministic key identifying an operation's distinguishing inputs.
///
/// Two operations with equal fingerprints are considered the same work;
/// the deduplicator collapses them while one is in flight. Callers must
/// build the fingerprint from every argument that affects the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Fingerprint cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        Self::new(value.to_string())
    }

    /// Fold compound or oversized inputs into a stable hex key. Parts are
    /// separated before hashing so `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn digest<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        let bytes = hasher.finalize();
        let mut hex = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
