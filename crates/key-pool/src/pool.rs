//! Round-robin key selection and failure-threshold bookkeeping
//!
//! The pool holds a fixed ordered key list, a shared rotation cursor, and a
//! per-key failure counter. The cursor and the counter map are synchronized
//! independently: an `AtomicUsize` for the cursor and an `RwLock` around the
//! counts, so contention on one never blocks the other. `next_working_key`
//! composes the two sequentially and never holds both, which means concurrent
//! failure reports may interleave with a scan in progress. That is fine; the
//! scan only promises termination and a best-effort result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Redacted form of a key for log fields and error messages: the last four
/// characters, enough to tell keys apart without leaking the credential.
pub(crate) fn key_tail(key: &str) -> String {
    let skip = key.chars().count().saturating_sub(4);
    let tail: String = key.chars().skip(skip).collect();
    format!("...{tail}")
}

/// Snapshot of all keys partitioned by validity, with their failure counts.
///
/// Taken under one read of the counter map, so every key lands in exactly
/// one of the two maps and its count matches the validity decision.
#[derive(Debug, Serialize)]
pub struct KeysByStatus {
    pub valid_keys: HashMap<String, u32>,
    pub invalid_keys: HashMap<String, u32>,
}

/// Pool of interchangeable credential keys with round-robin selection.
///
/// The key list is fixed at construction; there is no runtime add/remove.
/// A key is "valid" while its failure count is strictly below the configured
/// threshold. Invalid keys stay in rotation order but are skipped by
/// `next_working_key` until `reset_failure_counts` clears the counts.
#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
    failure_counts: RwLock<HashMap<String, u32>>,
    max_failures: u32,
    designated_key: Option<String>,
}

impl KeyPool {
    /// Create a pool over `keys` with the given failure threshold.
    ///
    /// `designated_key` is an optional out-of-rotation key (e.g. a paid
    /// tier) returned only by [`KeyPool::designated_key`]. Rejects an empty
    /// key list; every other input constructs a pool with the cursor at the
    /// first key and all counts at zero.
    pub fn new(
        keys: Vec<String>,
        max_failures: u32,
        designated_key: Option<String>,
    ) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::EmptyKeySet(
                "pool requires at least one key".into(),
            ));
        }
        let failure_counts: HashMap<String, u32> =
            keys.iter().map(|key| (key.clone(), 0)).collect();
        info!(keys = keys.len(), max_failures, "key pool initialized");
        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
            failure_counts: RwLock::new(failure_counts),
            max_failures,
            designated_key,
        })
    }

    /// The configured out-of-rotation key, if any. Touches no pool state.
    pub fn designated_key(&self) -> Option<&str> {
        self.designated_key.as_deref()
    }

    /// All keys in rotation order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false: construction rejects empty key sets.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    /// Take the next rotation turn: return the key at the cursor and advance
    /// it by one, wrapping modulo the pool size.
    ///
    /// The read-and-advance is a single atomic update, so every call
    /// observes a distinct pre-advance cursor value: no turn is skipped or
    /// handed to two callers, under any interleaving. Validity is not
    /// consulted here; use [`KeyPool::next_working_key`] to skip failed keys.
    pub fn next_key(&self) -> &str {
        let n = self.keys.len();
        // The closure is total, so fetch_update never returns Err.
        let idx = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % n))
            .unwrap_or_else(|i| i);
        metrics::counter!("key_pool_rotations_total").increment(1);
        &self.keys[idx]
    }

    /// Whether `key`'s failure count is strictly below the threshold.
    ///
    /// Lenient on unknown keys: a key the pool has never seen reads as
    /// count 0.
    pub async fn is_key_valid(&self, key: &str) -> bool {
        let counts = self.failure_counts.read().await;
        counts.get(key).copied().unwrap_or(0) < self.max_failures
    }

    /// Reset every failure count to zero in one critical section.
    ///
    /// Concurrent validity checks see either the old counts or all zeros,
    /// never a partial reset.
    pub async fn reset_failure_counts(&self) {
        let mut counts = self.failure_counts.write().await;
        for count in counts.values_mut() {
            *count = 0;
        }
        info!(keys = counts.len(), "failure counts reset");
    }

    /// Select the next key that is below the failure threshold.
    ///
    /// Advances the rotation and checks validity key by key. If a full
    /// cycle comes back to the starting key without finding a valid one,
    /// that key is returned anyway: when every key is over the threshold
    /// the pool degrades to best-effort rather than failing the caller.
    /// The return value is therefore "a key to try", not "a key known to
    /// be valid". Terminates within `len + 1` rotation turns.
    pub async fn next_working_key(&self) -> &str {
        let initial = self.next_key();
        let mut current = initial;
        loop {
            if self.is_key_valid(current).await {
                return current;
            }
            current = self.next_key();
            if current == initial {
                warn!(
                    keys = self.keys.len(),
                    "all keys at failure threshold, returning best-effort key"
                );
                metrics::counter!("key_pool_exhausted_scans_total").increment(1);
                return current;
            }
        }
    }

    /// Record a failed API call for `key` and return a replacement key.
    ///
    /// Increments the key's failure count; reaching the threshold is logged
    /// at warn level but the key stays in rotation (only a reset restores
    /// it). Errors with `UnknownKey` for a key outside the pool, leaving
    /// all counts untouched. The replacement comes from
    /// [`KeyPool::next_working_key`] and carries the same best-effort caveat.
    pub async fn handle_api_failure(&self, key: &str) -> Result<&str> {
        {
            let mut counts = self.failure_counts.write().await;
            let count = counts
                .get_mut(key)
                .ok_or_else(|| Error::UnknownKey(key_tail(key)))?;
            *count += 1;
            metrics::counter!("key_pool_failures_reported_total").increment(1);
            if *count >= self.max_failures {
                warn!(
                    key = %key_tail(key),
                    failures = *count,
                    max_failures = self.max_failures,
                    "key reached failure threshold"
                );
                if *count == self.max_failures {
                    metrics::counter!("key_pool_keys_invalidated_total").increment(1);
                }
            } else {
                debug!(key = %key_tail(key), failures = *count, "failure recorded");
            }
        }
        Ok(self.next_working_key().await)
    }

    /// Current failure count for `key`; 0 for a key the pool does not know.
    pub async fn get_fail_count(&self, key: &str) -> u32 {
        self.failure_counts
            .read()
            .await
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Partition all keys into valid and invalid maps with their counts.
    pub async fn keys_by_status(&self) -> KeysByStatus {
        let counts = self.failure_counts.read().await;
        let mut valid_keys = HashMap::new();
        let mut invalid_keys = HashMap::new();
        for key in &self.keys {
            let count = counts.get(key).copied().unwrap_or(0);
            if count < self.max_failures {
                valid_keys.insert(key.clone(), count);
            } else {
                invalid_keys.insert(key.clone(), count);
            }
        }
        KeysByStatus {
            valid_keys,
            invalid_keys,
        }
    }
}
