//! Bounded TTL key-value cache of last-known-good records.
//!
//! Backed by `moka`'s async cache with a per-entry expiry policy, so the Trip
//! and Baggage fetchers can each `put` with their own TTL while sharing one
//! cache instance. The core only depends on the `get`/`put` contract below —
//! an external cache could stand in without callers changing.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CacheValue {
    json: serde_json::Value,
    ttl: Duration,
    stored_at: DateTime<Utc>,
}

struct PerEntryExpiry;

impl Expiry<String, CacheValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// TTL-bounded cache of last-known-good Trip/Baggage snapshots.
pub struct FallbackStore {
    cache: Cache<String, CacheValue>,
}

impl FallbackStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .build();
        Self { cache }
    }

    /// Write a value under `key` with its own TTL. `null`-equivalent values
    /// are never stored by callers (the contract only ever puts real data).
    pub async fn put<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        let json = serde_json::to_value(value).expect("fallback values must be JSON-serializable");
        self.cache.insert(
            key.into(),
            CacheValue {
                json,
                ttl,
                stored_at: Utc::now(),
            },
        ).await;
    }

    /// Read a value back, along with when it was stored (used for
    /// `cacheTimestamp`). Returns `None` on miss or if it has expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<(T, DateTime<Utc>)> {
        let entry = self.cache.get(key).await?;
        let value = serde_json::from_value(entry.json).ok()?;
        Some((value, entry.stored_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[tokio::test]
    async fn put_then_get_round_trips_within_ttl() {
        let store = FallbackStore::new(100);
        store
            .put("trip:GHTW42", &Sample { value: 42 }, Duration::from_secs(600))
            .await;

        let (got, _stored_at): (Sample, _) = store.get("trip:GHTW42").await.unwrap();
        assert_eq!(got, Sample { value: 42 });
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let store = FallbackStore::new(100);
        let got: Option<(Sample, DateTime<Utc>)> = store.get("missing").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let store = FallbackStore::new(100);
        store
            .put("trip:GHTW42", &Sample { value: 1 }, Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.cache.run_pending_tasks().await;
        let got: Option<(Sample, DateTime<Utc>)> = store.get("trip:GHTW42").await;
        assert!(got.is_none());
    }
}
