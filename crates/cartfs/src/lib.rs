//! Byte-stream files on a remote, frame-addressed cartridge controller.
//!
//! cartfs turns a controller that stores fixed-size frames on numbered
//! cartridges into a small file interface: open, close, read, write, seek.
//!
//! # Crate Structure
//!
//! - [`transport`]: Blocking TCP / Unix socket connection to the controller
//! - [`proto`]: 64-bit opcode register codec and wire reader/writer
//! - [`cache`]: Fixed-capacity LRU frame cache
//! - [`client`]: Request/response bus, socket client and in-memory controller
//! - [`driver`]: File table, frame allocator and the [`CartDriver`]

/// Re-export transport types.
pub mod transport {
    pub use cartfs_transport::*;
}

/// Re-export protocol types.
pub mod proto {
    pub use cartfs_proto::*;
}

/// Re-export cache types.
pub mod cache {
    pub use cartfs_cache::*;
}

/// Re-export client types.
pub mod client {
    pub use cartfs_client::*;
}

/// Re-export driver types.
pub mod driver {
    pub use cartfs_driver::*;
}

pub use cartfs_client::{BusClient, ClientConfig, LoopbackController};
pub use cartfs_driver::{CartDriver, DriverConfig, DriverError, FileHandle};
