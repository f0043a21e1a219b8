use std::fmt;

use cartfs_proto::{CartridgeId, FrameId};

use crate::error::{DriverError, Result};

/// Physical address of a frame on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameAddr {
    pub cartridge: CartridgeId,
    pub frame: FrameId,
}

impl FrameAddr {
    pub fn new(cartridge: CartridgeId, frame: FrameId) -> Self {
        Self { cartridge, frame }
    }
}

impl fmt::Display for FrameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.cartridge, self.frame)
    }
}

/// Append-only frame allocator.
///
/// Hands out frames of cartridge 0 in order, then cartridge 1, and so on.
/// Nothing is ever freed.
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    next: FrameAddr,
    frames_per_cartridge: u16,
    max_cartridges: u16,
    allocated: u64,
}

impl FrameAllocator {
    pub fn new(max_cartridges: u16, frames_per_cartridge: u16) -> Self {
        Self {
            next: FrameAddr::new(0, 0),
            frames_per_cartridge,
            max_cartridges,
            allocated: 0,
        }
    }

    /// Take the frame under the cursor and advance.
    pub fn allocate(&mut self) -> Result<FrameAddr> {
        if self.next.cartridge >= self.max_cartridges {
            return Err(DriverError::DeviceFull);
        }

        let addr = self.next;
        self.next.frame += 1;
        if self.next.frame >= self.frames_per_cartridge {
            self.next.frame = 0;
            self.next.cartridge += 1;
        }
        self.allocated += 1;
        Ok(addr)
    }

    /// The frame the next allocation returns.
    pub fn cursor(&self) -> FrameAddr {
        self.next
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn remaining(&self) -> u64 {
        let total = self.max_cartridges as u64 * self.frames_per_cartridge as u64;
        total - self.allocated
    }
}
