use super::CompletionRequest;
use crate::config::CacheConfig;
use crate::core::ids::IdGenerator;
use crate::core::types::AnswerResponse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Fingerprint of the backend messages plus the routed model id.
///
/// Requests differing only in sampling parameters share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &CompletionRequest) -> Self {
        let digest = blake3::hash(request.messages_json().as_bytes());
        Self(format!("{}-{}", digest.to_hex(), request.model))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Bounds on the response cache. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_entries: Option<usize>,
    pub ttl: Option<Duration>,
}

impl CachePolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            ttl: config.ttl_secs.map(Duration::from_secs),
        }
    }
}

struct CacheEntry {
    response: AnswerResponse,
    inserted: Instant,
    last_used: Instant,
}

/// In-memory store of successful answers, keyed by [`CacheKey`].
pub struct ResponseCache {
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ResponseCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            entries: HashMap::new(),
        }
    }

    /// Replay a stored answer under a fresh id with zero usage.
    pub fn get(&mut self, key: &CacheKey, ids: &dyn IdGenerator) -> Option<AnswerResponse> {
        let now = self.clock.now();

        if let Some(ttl) = self.policy.ttl {
            let expired = self
                .entries
                .get(key)
                .map(|entry| now.saturating_duration_since(entry.inserted) >= ttl)
                .unwrap_or(false);
            if expired {
                self.entries.remove(key);
                tracing::debug!("Cache entry expired: {}", key.as_str());
                return None;
            }
        }

        let entry = self.entries.get_mut(key)?;
        entry.last_used = now;
        Some(entry.response.replayed(ids.response_id()))
    }

    pub fn put(&mut self, key: CacheKey, response: AnswerResponse) {
        let now = self.clock.now();

        if let Some(ttl) = self.policy.ttl {
            let before = self.entries.len();
            self.entries
                .retain(|_, entry| now.saturating_duration_since(entry.inserted) < ttl);
            let swept = before - self.entries.len();
            if swept > 0 {
                tracing::debug!("Swept {} expired cache entries", swept);
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                response,
                inserted: now,
                last_used: now,
            },
        );

        if let Some(max) = self.policy.max_entries {
            while self.entries.len() > max {
                self.evict_lru();
            }
        }
    }

    /// Evict the least recently used entry
    fn evict_lru(&mut self) {
        if let Some((lru_key, _)) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
        {
            let key = lru_key.clone();
            self.entries.remove(&key);
            tracing::debug!("Evicted LRU cache entry: {}", key.as_str());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
