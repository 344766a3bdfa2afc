//! Memoization support for scored batches.
//!
//! Scoring is cheap but batches can be large and are often resubmitted unchanged, so
//! responses are cached under a fingerprint of the request. Cached payloads carry a
//! SHA-256 checksum and are discarded if it no longer matches.
//!
//! A scored batch also depends on the clock (external score freshness, lead age), so
//! every entry carries the instant at which it stops being valid.

use chrono::{DateTime, Utc};
use moka::Expiry;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::models::{ScoreRequest, ScoreResponse};

/// Cache key for a scoring request: hex SHA-256 of its canonical JSON.
pub fn request_fingerprint(request: &ScoreRequest) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(request)?;
    Ok(sha256_hex(&bytes))
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Serialized response plus its checksum, as stored in the cache.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// The scored batch (JSON string)
    pub data: String,
    /// SHA-256 checksum of `data` (hex encoded)
    pub checksum: String,
    /// The response must not be served at or after this instant.
    pub expires_at: DateTime<Utc>,
}

impl ValidatedCacheEntry {
    pub fn seal(
        response: &ScoreResponse,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_string(response)?;
        let checksum = sha256_hex(data.as_bytes());
        Ok(Self {
            data,
            checksum,
            expires_at,
        })
    }

    pub fn is_valid(&self) -> bool {
        sha256_hex(self.data.as_bytes()) == self.checksum
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Remaining lifetime as seen from `now`; zero once expired.
    pub fn time_to_live(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// The cached response, or `None` if the entry is corrupted.
    pub fn open(&self) -> Option<ScoreResponse> {
        if !self.is_valid() {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                self.checksum,
                self.data.len()
            );
            return None;
        }

        match serde_json::from_str(&self.data) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!("Discarding unreadable cached score response: {}", e);
                None
            }
        }
    }
}

/// Per-entry expiration for the score cache, driven by `ValidatedCacheEntry::expires_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCacheExpiry;

impl Expiry<String, ValidatedCacheEntry> for ScoreCacheExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &ValidatedCacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.time_to_live(Utc::now()))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &ValidatedCacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.time_to_live(Utc::now()))
    }
}
