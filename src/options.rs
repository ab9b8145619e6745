use std::time::Duration;

use crate::CacheTarget;

/// Configures transport timeout and retry defaults for an executor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutorOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries applied when a call does not override them (2 retries,
    /// 3 total attempts).
    pub default_retries: u32,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            default_retries: 2,
            retry_delay_ms: 3_000,
        }
    }
}

/// Per-call configuration, supplied fresh on every `execute`.
///
/// These are the only recognized options; there is no pass-through of
/// arbitrary keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReqConfig {
    /// When set, the cache is consulted before the network and the
    /// successful result is written back. When absent, the call still
    /// coalesces with identical in-flight requests but nothing is cached.
    pub cache: Option<CacheConfig>,
    /// Retry override: `None` uses the executor default, `Some(0)` disables
    /// retries entirely, `Some(k)` allows `k` retries (`k + 1` attempts).
    pub retries: Option<u32>,
}

impl ReqConfig {
    /// Config with in-memory caching and default retries.
    pub fn cached(expires_in: Duration) -> Self {
        Self {
            cache: Some(CacheConfig::memory(expires_in)),
            retries: None,
        }
    }

    /// Sets the retry override.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Caching section of a [`ReqConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for the successful result. `Duration::ZERO` is valid and means
    /// "always stale": no reuse across calls, but concurrent identical calls
    /// still coalesce.
    pub expires_in: Duration,
    /// Backing targets consulted (in order) and written (all of them).
    pub targets: Vec<CacheTarget>,
}

impl CacheConfig {
    /// In-memory target only.
    pub fn memory(expires_in: Duration) -> Self {
        Self {
            expires_in,
            targets: vec![CacheTarget::Memory],
        }
    }
}
