//! TTL-keyed storage of prior successful responses.
//!
//! The store routes reads and writes through enumerated [`CacheTarget`]s so
//! additional backing stores can be added without touching the executor.
//! Expiry is lazy: entries are checked at lookup time, never swept.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::HttpResponse;

/// Enumerated cache backing targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CacheTarget {
    /// Process-local in-memory map. The only target shipped today; entries
    /// do not survive the process.
    Memory,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: HttpResponse,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// A zero TTL means the entry is already stale at the first lookup, so
    /// callers get coalescing without cross-call reuse.
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

trait CacheBackend: Send + Sync {
    fn get(&self, fingerprint: &str) -> Option<CacheEntry>;
    fn put(&self, fingerprint: String, entry: CacheEntry);
    fn remove(&self, fingerprint: &str);
    fn clear(&self);
}

#[derive(Default)]
struct MemoryBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheBackend for MemoryBackend {
    fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        self.lock().get(fingerprint).cloned()
    }

    fn put(&self, fingerprint: String, entry: CacheEntry) {
        self.lock().insert(fingerprint, entry);
    }

    fn remove(&self, fingerprint: &str) {
        self.lock().remove(fingerprint);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

impl MemoryBackend {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A poisoned lock means a panic while holding it; cached responses
        // are plain data, so continuing with the map is sound.
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Owns one backend per [`CacheTarget`]; never stores failed results.
pub(crate) struct CacheStore {
    backends: Vec<(CacheTarget, Box<dyn CacheBackend>)>,
}

impl CacheStore {
    pub(crate) fn new() -> Self {
        let memory: Box<dyn CacheBackend> = Box::new(MemoryBackend::default());
        Self {
            backends: vec![(CacheTarget::Memory, memory)],
        }
    }

    /// Looks the fingerprint up across the requested targets, in order.
    ///
    /// A miss is reported both when the entry is absent and when it has
    /// expired; expired entries are dropped on the spot.
    pub(crate) fn get(&self, fingerprint: &str, targets: &[CacheTarget]) -> Option<HttpResponse> {
        for (target, backend) in &self.backends {
            if !targets.contains(target) {
                continue;
            }
            if let Some(entry) = backend.get(fingerprint) {
                if entry.is_expired() {
                    backend.remove(fingerprint);
                    continue;
                }
                return Some(entry.value);
            }
        }
        None
    }

    pub(crate) fn put(
        &self,
        fingerprint: &str,
        value: HttpResponse,
        expires_in: Duration,
        targets: &[CacheTarget],
    ) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl: expires_in,
        };
        for (target, backend) in &self.backends {
            if targets.contains(target) {
                backend.put(fingerprint.to_owned(), entry.clone());
            }
        }
    }

    /// Clears every target.
    pub(crate) fn invalidate_all(&self) {
        for (_, backend) in &self.backends {
            backend.clear();
        }
    }
}
