//! Fixed-capacity frame cache with least-recently-used eviction.
//!
//! Every cached unit is one whole frame, keyed by `(cartridge, frame)`.
//! Recency is tracked with a per-slot age counter that ticks on every
//! lookup and insert, so a scan over the slots finds the victim.

pub mod cache;
pub mod error;

pub use cache::{CacheKey, CacheStats, FrameCache, DEFAULT_CACHE_FRAMES};
pub use error::{CacheError, Result};
