//! Response Cache
//!
//! In-memory TTL cache for operation responses with bounded, insertion-order
//! eviction. When full, the oldest-inserted entry is evicted regardless of how
//! recently it was read. Shared by all concurrent callers of one orchestrator.
//!
//! Keys are derived from the operation name plus a canonical (key-sorted) JSON
//! serialization of the request, so logically identical requests collide even
//! when their fields were built in a different order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

use crate::constants::cache as cache_constants;
use crate::types::{OperationKind, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Per-operation default TTLs in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub summarize: u64,
    pub enhance: u64,
    pub validate: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            summarize: cache_constants::SUMMARIZE_TTL_SECS,
            enhance: cache_constants::ENHANCE_TTL_SECS,
            validate: cache_constants::VALIDATE_TTL_SECS,
        }
    }
}

impl CacheTtls {
    pub fn for_operation(&self, kind: OperationKind) -> Duration {
        let secs = match kind {
            OperationKind::Summarize => self.summarize,
            OperationKind::Enhance => self.enhance,
            OperationKind::Validate => self.validate,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
    pub ttl: CacheTtls,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: cache_constants::DEFAULT_MAX_SIZE,
            ttl: CacheTtls::default(),
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Serialize `value` with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Cache key for an operation request: hex SHA-256 of `op:canonical_json`
pub fn cache_key<T: Serialize>(operation: &str, request: &T) -> Result<String> {
    let value = serde_json::to_value(request)?;
    Ok(key_for_value(operation, &value))
}

fn key_for_value(operation: &str, value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b":");
    hasher.update(canonical_json(value).as_bytes());
    format!("{:x}", hasher.finalize())
}

// =============================================================================
// Cache
// =============================================================================

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
}

impl CacheStats {
    /// Cache hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    /// Insertion sequence number, key into `CacheState::order`
    seq: u64,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
    stats: CacheStats,
}

impl<V> CacheState<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
            self.stats.evictions += 1;
            debug!(key = %short_key(&key), "Cache evicted oldest entry");
        }
    }
}

/// Bounded TTL cache with insertion-order eviction
pub struct ResponseCache<V> {
    max_size: usize,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Response cache mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up `key`; expired entries are removed and reported as a miss
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.lock();
        let now = Instant::now();

        let expired = match state.entries.get(key) {
            None => {
                state.stats.misses += 1;
                return None;
            }
            Some(entry) => now > entry.expires_at,
        };

        if expired {
            state.remove(key);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            debug!(key = %short_key(key), "Cache entry expired");
            return None;
        }

        state.stats.hits += 1;
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// Re-storing an existing key overwrites it in place and keeps its
    /// insertion position. A new key arriving at capacity evicts exactly one
    /// entry, the oldest inserted.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let mut state = self.lock();
        let expires_at = Instant::now() + ttl;

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.expires_at = expires_at;
            return;
        }

        if state.entries.len() >= self.max_size {
            state.evict_oldest();
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.insert(seq, key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                seq,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        let state = self.lock();
        state
            .entries
            .get(key)
            .is_some_and(|entry| Instant::now() <= entry.expires_at)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut state = self.lock();
        let now = Instant::now();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| now > entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        state.stats.expirations += expired.len() as u64;
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            size: state.entries.len(),
            ..state.stats
        }
    }
}

fn short_key(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}
