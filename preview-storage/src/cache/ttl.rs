//! Concurrent key/value cache with a fixed time-to-live.
//!
//! Every miss is handed a ticket from a monotonic counter. Invalidation
//! removes the key and advances a removal watermark to a fresh ticket; a
//! fill only lands if its ticket is newer than both the watermark and the
//! ticket of any value already stored under the key. The check and the
//! write happen under the map's shard lock, so an invalidation issued while
//! a fetch is in flight always wins.
//!
//! Expiry is lazy: an expired value is reported as a miss and overwritten
//! by the next fill. [`TtlCache::purge_expired`] removes expired keys in
//! bulk so the map does not keep every id ever looked up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use super::stats::{CacheStats, StatsCounters};

/// Ticket issued by a miss, handed back to [`TtlCache::fill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FillToken(u64);

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Hit(V),
    Miss(FillToken),
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    inserted_at: Instant,
    /// Ticket of the fill that stored `value`.
    token: FillToken,
}

impl<V> Slot<V> {
    fn live(&self, ttl: Duration) -> Option<&V> {
        (self.inserted_at.elapsed() < ttl).then_some(&self.value)
    }
}

#[derive(Debug)]
pub struct TtlCache<V> {
    slots: DashMap<String, Slot<V>>,
    ttl: Duration,
    tickets: AtomicU64,
    /// Ticket taken by the most recent invalidation.
    removed_at: AtomicU64,
    stats: StatsCounters,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
            tickets: AtomicU64::new(0),
            removed_at: AtomicU64::new(0),
            stats: StatsCounters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn lookup(&self, key: &str) -> Lookup<V> {
        if let Some(slot) = self.slots.get(key) {
            if let Some(value) = slot.live(self.ttl) {
                self.stats.record_hit();
                return Lookup::Hit(value.clone());
            }
        }
        self.stats.record_miss();
        Lookup::Miss(FillToken(self.next_ticket()))
    }

    /// Store `value` unless `key` was invalidated since `token` was issued
    /// or a fetch that started later already stored its result.
    /// Returns whether the value was stored.
    pub fn fill(&self, key: &str, value: V, token: FillToken) -> bool {
        let slot = Slot {
            value,
            inserted_at: Instant::now(),
            token,
        };
        let stored = match self.slots.entry(key.to_string()) {
            Entry::Occupied(mut current) if current.get().token < token => {
                current.insert(slot);
                true
            }
            Entry::Vacant(vacant) if token.0 > self.removed_at.load(Ordering::SeqCst) => {
                vacant.insert(slot);
                true
            }
            _ => false,
        };
        if !stored {
            self.stats.record_discarded_fill();
        }
        stored
    }

    /// Remove `key` and fence off in-flight fills.
    /// Returns whether a live value was evicted.
    pub fn invalidate(&self, key: &str) -> bool {
        self.stats.record_invalidation();
        // The watermark moves before the removal so a fill that finds the
        // key vacant also sees the new watermark.
        self.removed_at.fetch_max(self.next_ticket(), Ordering::SeqCst);
        self.slots
            .remove(key)
            .is_some_and(|(_, slot)| slot.live(self.ttl).is_some())
    }

    /// Remove every expired key. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| slot.inserted_at.elapsed() < self.ttl);
        before.saturating_sub(self.slots.len())
    }

    /// Number of live (unexpired) values.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.live(self.ttl).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys held, expired or not.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len() as u64)
    }
}
