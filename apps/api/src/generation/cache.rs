//! Response Cache — exact-match prompt → normalized roadmap, bounded by TTL and size.
//!
//! One mutex guards the whole map. Every public operation is a single short
//! critical section and never spans an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::debug;

use crate::models::roadmap::RoadmapDocument;

pub const DEFAULT_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_SIZE: usize = 1000;
/// An eviction sweep runs after this many insertions, or sooner if an
/// insertion pushes the cache over its maximum size.
pub const SWEEP_INTERVAL: usize = 32;

/// A cache hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRoadmap {
    pub document: RoadmapDocument,
    pub generated_at: DateTime<Utc>,
}

struct CacheEntry {
    inserted_at: Instant,
    /// Insertion order; eviction removes the lowest first.
    sequence: u64,
    generated_at: DateTime<Utc>,
    document: RoadmapDocument,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_sequence: u64,
    inserts_since_sweep: usize,
}

pub struct ResponseCache {
    ttl: Duration,
    max_size: usize,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size: max_size.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock cannot leave an entry half-written,
        // so the state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the entry for `key` if it is younger than the TTL. Stale
    /// entries are never returned, even before a sweep removes them.
    pub fn get(&self, key: &str) -> Option<CachedRoadmap> {
        let state = self.lock();
        let entry = state.entries.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(CachedRoadmap {
            document: entry.document.clone(),
            generated_at: entry.generated_at,
        })
    }

    /// Stores `document` under `key`, replacing any previous entry wholesale.
    pub fn put(&self, key: String, document: RoadmapDocument, generated_at: DateTime<Utc>) {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                sequence,
                generated_at,
                document,
            },
        );
        state.inserts_since_sweep += 1;

        if state.inserts_since_sweep >= SWEEP_INTERVAL || state.entries.len() > self.max_size {
            let removed = sweep_locked(&mut state, self.ttl, self.max_size);
            if removed > 0 {
                debug!(removed, remaining = state.entries.len(), "Response cache sweep");
            }
        }
    }

    /// Removes expired entries, then the oldest-inserted until the size
    /// bound holds. Returns how many entries were removed.
    pub fn sweep(&self) -> usize {
        let mut state = self.lock();
        sweep_locked(&mut state, self.ttl, self.max_size)
    }

    /// Drops every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let removed = state.entries.len();
        state.entries.clear();
        state.inserts_since_sweep = 0;
        removed
    }

    /// Physical entry count, including expired entries not yet swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sweep_locked(state: &mut CacheState, ttl: Duration, max_size: usize) -> usize {
    let before = state.entries.len();
    state.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

    if state.entries.len() > max_size {
        let mut by_age: Vec<(u64, String)> = state
            .entries
            .iter()
            .map(|(key, entry)| (entry.sequence, key.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(sequence, _)| *sequence);

        let excess = state.entries.len() - max_size;
        for (_, key) in by_age.into_iter().take(excess) {
            state.entries.remove(&key);
        }
    }

    state.inserts_since_sweep = 0;
    before - state.entries.len()
}
