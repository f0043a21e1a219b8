use bytes::Bytes;
use cartfs_proto::{CartridgeId, FrameId, FRAME_SIZE};
use tracing::{debug, trace};

use crate::error::{CacheError, Result};

/// Default cache capacity in frames.
pub const DEFAULT_CACHE_FRAMES: usize = 1024;

/// Physical address of a cached frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub cartridge: CartridgeId,
    pub frame: FrameId,
}

impl CacheKey {
    pub fn new(cartridge: CartridgeId, frame: FrameId) -> Self {
        Self { cartridge, frame }
    }
}

/// Hit/miss counters since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct Slot {
    key: CacheKey,
    age: u64,
    block: Bytes,
}

/// Fixed-capacity associative frame store with LRU eviction.
///
/// Slots fill in index order; once full, the slot with the strictly
/// greatest age is overwritten, ties going to the lowest index. At most one
/// slot holds a given key.
#[derive(Debug)]
pub struct FrameCache {
    capacity: usize,
    /// Occupied slots; `slots.len()` is the occupancy.
    slots: Vec<Slot>,
    stats: CacheStats,
}

impl FrameCache {
    /// Create an empty cache holding at most `capacity` frames.
    ///
    /// Slots are allocated as frames arrive, so a large capacity costs
    /// nothing until it is filled.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            slots: Vec::new(),
            stats: CacheStats::default(),
        })
    }

    /// Look up a frame.
    ///
    /// Ages every occupied slot by one, then resets the hit slot to zero.
    pub fn lookup(&mut self, cartridge: CartridgeId, frame: FrameId) -> Option<Bytes> {
        self.tick();
        let key = CacheKey::new(cartridge, frame);
        match self.slots.iter_mut().find(|slot| slot.key == key) {
            Some(slot) => {
                slot.age = 0;
                self.stats.hits += 1;
                trace!(cartridge, frame, "cache hit");
                Some(slot.block.clone())
            }
            None => {
                self.stats.misses += 1;
                trace!(cartridge, frame, "cache miss");
                None
            }
        }
    }

    /// Insert or overwrite a frame.
    ///
    /// Ages every occupied slot by one. An existing entry for the key is
    /// overwritten in place; otherwise the next free slot is used, or the
    /// oldest slot is evicted when the cache is full.
    pub fn insert(
        &mut self,
        cartridge: CartridgeId,
        frame: FrameId,
        block: impl Into<Bytes>,
    ) -> Result<()> {
        let block = block.into();
        if block.len() != FRAME_SIZE {
            return Err(CacheError::FrameSize {
                size: block.len(),
                expected: FRAME_SIZE,
            });
        }

        self.tick();
        self.stats.inserts += 1;
        let key = CacheKey::new(cartridge, frame);

        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.key == key) {
            slot.block = block;
            slot.age = 0;
            return Ok(());
        }

        let slot = Slot { key, age: 0, block };
        if self.slots.len() < self.capacity {
            self.slots.push(slot);
            return Ok(());
        }

        let victim = self.oldest_slot();
        let evicted = std::mem::replace(&mut self.slots[victim], slot);
        self.stats.evictions += 1;
        debug!(
            slot = victim,
            evicted_cartridge = evicted.key.cartridge,
            evicted_frame = evicted.key.frame,
            age = evicted.age,
            "evicted frame from cache"
        );
        Ok(())
    }

    /// Drop every entry and zero the counters. Capacity is kept.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.stats = CacheStats::default();
    }

    /// True if the key is cached. Does not age any slot.
    pub fn contains(&self, cartridge: CartridgeId, frame: FrameId) -> bool {
        let key = CacheKey::new(cartridge, frame);
        self.slots.iter().any(|slot| slot.key == key)
    }

    /// Cached block for a key without touching recency.
    pub fn peek(&self, cartridge: CartridgeId, frame: FrameId) -> Option<&Bytes> {
        let key = CacheKey::new(cartridge, frame);
        self.slots
            .iter()
            .find(|slot| slot.key == key)
            .map(|slot| &slot.block)
    }

    /// Cached keys in slot order.
    pub fn keys(&self) -> impl Iterator<Item = CacheKey> + '_ {
        self.slots.iter().map(|slot| slot.key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn tick(&mut self) {
        for slot in &mut self.slots {
            slot.age = slot.age.saturating_add(1);
        }
    }

    fn oldest_slot(&self) -> usize {
        let mut victim = 0;
        for (idx, slot) in self.slots.iter().enumerate().skip(1) {
            if slot.age > self.slots[victim].age {
                victim = idx;
            }
        }
        victim
    }
}
