//! Tile cache with in-flight deduplication and LRU eviction.
//!
//! A key is either *pending* (a rasterization is in flight, shared by every
//! cycle that wants it) or *ready* (a finished bitmap). Reserving a missing
//! key and recording the in-flight render happen in one call, so two cycles
//! can never start the same render twice. Ready tiles are evicted
//! least-recently-used first once `capacity` is exceeded; pending tiles are
//! never evicted.

use crate::renderer::{RenderResult, TileBitmap};
use crate::tile::TileKey;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Arc;

/// An in-flight tile render that any number of waiters can await.
pub type TileFuture = Shared<BoxFuture<'static, RenderResult<Arc<TileBitmap>>>>;

enum Slot {
    Pending { ticket: u64, future: TileFuture },
    Ready { bitmap: Arc<TileBitmap>, last_used: u64 },
}

/// Outcome of [`TileCache::acquire`].
pub enum Acquired {
    /// A finished bitmap.
    Ready(Arc<TileBitmap>),
    /// Another cycle already started this render.
    Joined(TileFuture),
    /// A new render was reserved and started by this call.
    Dispatched(TileFuture),
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub joins: u64,
    pub dispatches: u64,
    pub failures: u64,
    pub evictions: u64,
}

/// Rendered tiles keyed by page, scale and origin.
pub struct TileCache {
    slots: HashMap<TileKey, Slot>,
    capacity: usize,
    ready: usize,
    clock: u64,
    next_ticket: u64,
    stats: CacheStats,
}

impl TileCache {
    /// Create a cache holding at most `capacity` ready tiles.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            capacity: capacity.max(1),
            ready: 0,
            clock: 0,
            next_ticket: 0,
            stats: CacheStats::default(),
        }
    }

    /// Maximum number of ready tiles.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of ready and pending entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of ready tiles.
    pub fn ready_len(&self) -> usize {
        self.ready
    }

    /// Number of renders in flight.
    pub fn pending_len(&self) -> usize {
        self.slots.len() - self.ready
    }

    /// Counters since creation.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Check if `key` is ready.
    pub fn is_ready(&self, key: &TileKey) -> bool {
        matches!(self.slots.get(key), Some(Slot::Ready { .. }))
    }

    /// Check if `key` is being rendered.
    pub fn is_pending(&self, key: &TileKey) -> bool {
        matches!(self.slots.get(key), Some(Slot::Pending { .. }))
    }

    /// Get a ready tile, marking it recently used.
    pub fn get(&mut self, key: &TileKey) -> Option<Arc<TileBitmap>> {
        let now = self.tick();
        match self.slots.get_mut(key) {
            Some(Slot::Ready { bitmap, last_used }) => {
                *last_used = now;
                Some(Arc::clone(bitmap))
            }
            _ => None,
        }
    }

    /// Look up `key`, reserving it with `dispatch` if it is missing.
    ///
    /// `dispatch` receives the reservation ticket that the finished render
    /// must pass back to [`TileCache::complete`].
    pub fn acquire<F>(&mut self, key: TileKey, dispatch: F) -> Acquired
    where
        F: FnOnce(u64) -> TileFuture,
    {
        let now = self.tick();
        match self.slots.get_mut(&key) {
            Some(Slot::Ready { bitmap, last_used }) => {
                *last_used = now;
                self.stats.hits += 1;
                return Acquired::Ready(Arc::clone(bitmap));
            }
            Some(Slot::Pending { future, .. }) => {
                self.stats.joins += 1;
                return Acquired::Joined(future.clone());
            }
            None => {}
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let future = dispatch(ticket);
        self.slots.insert(key, Slot::Pending {
            ticket,
            future: future.clone(),
        });
        self.stats.dispatches += 1;
        Acquired::Dispatched(future)
    }

    /// Record the result of the render reserved under `ticket`.
    ///
    /// Success promotes the entry to ready. Failure drops the reservation so
    /// the next cycle retries. Stale tickets are ignored.
    pub fn complete(&mut self, key: TileKey, ticket: u64, result: &RenderResult<Arc<TileBitmap>>) {
        let current = matches!(
            self.slots.get(&key),
            Some(Slot::Pending { ticket: reserved, .. }) if *reserved == ticket
        );
        if !current {
            return;
        }

        match result {
            Ok(bitmap) => {
                let last_used = self.tick();
                self.slots.insert(key, Slot::Ready {
                    bitmap: Arc::clone(bitmap),
                    last_used,
                });
                self.ready += 1;
                self.evict_over_capacity();
            }
            Err(_) => {
                self.slots.remove(&key);
                self.stats.failures += 1;
            }
        }
    }

    /// Store a finished tile directly. An existing entry is replaced.
    pub fn insert(&mut self, key: TileKey, bitmap: Arc<TileBitmap>) {
        let last_used = self.tick();
        let previous = self.slots.insert(key, Slot::Ready { bitmap, last_used });
        if !matches!(previous, Some(Slot::Ready { .. })) {
            self.ready += 1;
        }
        self.evict_over_capacity();
    }

    /// Drop every entry. In-flight renders finish but are not stored.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.ready = 0;
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_over_capacity(&mut self) {
        while self.ready > self.capacity {
            let oldest = self
                .slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready { last_used, .. } => Some((*last_used, *key)),
                    Slot::Pending { .. } => None,
                })
                .min_by_key(|(last_used, _)| *last_used)
                .map(|(_, key)| key);

            let Some(key) = oldest else { break };
            log::trace!("evicting tile {:?}", key);
            self.slots.remove(&key);
            self.ready -= 1;
            self.stats.evictions += 1;
        }
    }
}
