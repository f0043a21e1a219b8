//! Byte-stream files over a frame-addressed cartridge controller.
//!
//! [`CartDriver`] owns the open-file table, the append-only frame
//! allocator and the frame cache. Reads and writes are split into
//! per-frame spans; each frame is served from the cache or fetched over
//! the [`CartBus`](cartfs_client::CartBus), and writes go through to the
//! controller before the cache is updated.

pub mod alloc;
pub mod config;
pub mod driver;
pub mod error;
pub mod file;
pub mod span;

pub use alloc::{FrameAddr, FrameAllocator};
pub use config::DriverConfig;
pub use driver::{CartDriver, PowerOffError};
pub use error::{DriverError, Result};
pub use file::{FileHandle, FileTable, OpenFile};
pub use span::{spans, FrameSpan, Spans};
