use bytes::{Buf, BufMut, BytesMut};

use crate::error::Result;
use crate::opcode::Opcode;

/// Register size on the wire: one big-endian u64.
pub const REGISTER_SIZE: usize = 8;

/// Bytes per frame.
pub const FRAME_SIZE: usize = 1024;

/// Frames per cartridge.
pub const FRAMES_PER_CARTRIDGE: u16 = 1024;

/// Cartridges in a controller.
pub const MAX_CARTRIDGES: u16 = 64;

/// Cartridge number.
pub type CartridgeId = u16;

/// Frame number within a cartridge.
pub type FrameId = u16;

const PRIMARY_SHIFT: u32 = 56;
const SECONDARY_SHIFT: u32 = 48;
const STATUS_SHIFT: u32 = 47;
const CARTRIDGE_SHIFT: u32 = 31;
const FRAME_SHIFT: u32 = 15;

/// Pack register fields into the 64-bit wire value.
///
/// ```text
/// 63      56 55      48  47  46          31 30          15 14     0
/// ┌─────────┬──────────┬────┬──────────────┬──────────────┬────────┐
/// │ primary │secondary │ rt │  cartridge   │    frame     │ unused │
/// └─────────┴──────────┴────┴──────────────┴──────────────┴────────┘
/// ```
///
/// `status` is truncated to its low bit.
pub fn encode(primary: u8, secondary: u8, status: u8, cartridge: CartridgeId, frame: FrameId) -> u64 {
    ((primary as u64) << PRIMARY_SHIFT)
        | ((secondary as u64) << SECONDARY_SHIFT)
        | (((status & 1) as u64) << STATUS_SHIFT)
        | ((cartridge as u64) << CARTRIDGE_SHIFT)
        | ((frame as u64) << FRAME_SHIFT)
}

/// Unpack a 64-bit wire value. Unused low bits are ignored.
pub fn decode(value: u64) -> Register {
    Register {
        primary: (value >> PRIMARY_SHIFT) as u8,
        secondary: (value >> SECONDARY_SHIFT) as u8,
        status: ((value >> STATUS_SHIFT) & 1) as u8,
        cartridge: (value >> CARTRIDGE_SHIFT) as u16,
        frame: (value >> FRAME_SHIFT) as u16,
    }
}

/// A decoded opcode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Register {
    /// Primary opcode byte.
    pub primary: u8,
    /// Secondary opcode byte (reserved, sent as 0).
    pub secondary: u8,
    /// Status bit: 0 for success, 1 for failure.
    pub status: u8,
    /// Cartridge field.
    pub cartridge: CartridgeId,
    /// Frame field.
    pub frame: FrameId,
}

impl Register {
    /// Build a request register for `op`.
    pub fn request(op: Opcode, cartridge: CartridgeId, frame: FrameId) -> Self {
        Self {
            primary: op.as_u8(),
            secondary: 0,
            status: 0,
            cartridge,
            frame,
        }
    }

    /// Echo this register back with the status bit set or cleared.
    pub fn respond(self, ok: bool) -> Self {
        Self {
            status: u8::from(!ok),
            ..self
        }
    }

    /// The primary opcode, if it names a known command.
    pub fn opcode(&self) -> Result<Opcode> {
        Opcode::try_from(self.primary)
    }

    /// True if the status bit reports success.
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    /// The packed 64-bit value.
    pub fn to_u64(&self) -> u64 {
        encode(
            self.primary,
            self.secondary,
            self.status,
            self.cartridge,
            self.frame,
        )
    }

    /// Append the big-endian wire form to `dst`.
    pub fn put(&self, dst: &mut BytesMut) {
        dst.reserve(REGISTER_SIZE);
        dst.put_u64(self.to_u64());
    }

    /// Take one register off the front of `src`.
    ///
    /// Returns `None` if fewer than [`REGISTER_SIZE`] bytes are buffered.
    pub fn take(src: &mut BytesMut) -> Option<Self> {
        if src.len() < REGISTER_SIZE {
            return None;
        }
        Some(decode(src.get_u64()))
    }
}

impl From<u64> for Register {
    fn from(value: u64) -> Self {
        decode(value)
    }
}

impl From<Register> for u64 {
    fn from(reg: Register) -> Self {
        reg.to_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_positions() {
        assert_eq!(encode(0xff, 0, 0, 0, 0), 0xff00_0000_0000_0000);
        assert_eq!(encode(0, 0xff, 0, 0, 0), 0x00ff_0000_0000_0000);
        assert_eq!(encode(0, 0, 1, 0, 0), 1 << 47);
        assert_eq!(encode(0, 0, 0, 0xffff, 0), 0xffff << 31);
        assert_eq!(encode(0, 0, 0, 0, 0xffff), 0xffff << 15);
        assert_eq!(encode(0xff, 0xff, 1, 0xffff, 0xffff) & 0x7fff, 0);
    }

    #[test]
    fn test_status_truncates_to_one_bit() {
        assert_eq!(encode(0, 0, 3, 0, 0), encode(0, 0, 1, 0, 0));
        assert_eq!(encode(0, 0, 2, 0, 0), 0);
    }

    #[test]
    fn test_round_trip_extremes() {
        for primary in Opcode::ALL.iter().map(|op| op.as_u8()) {
            for secondary in [0u8, 1] {
                for status in [0u8, 1] {
                    for (cartridge, frame) in [(0, 0), (65535, 65535), (1, 65534), (40000, 7)] {
                        let reg = decode(encode(primary, secondary, status, cartridge, frame));
                        assert_eq!(
                            reg,
                            Register {
                                primary,
                                secondary,
                                status,
                                cartridge,
                                frame
                            }
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_decode_ignores_unused_bits() {
        let value = encode(4, 0, 0, 9, 17) | 0x7fff;
        let reg = decode(value);
        assert_eq!(reg.cartridge, 9);
        assert_eq!(reg.frame, 17);
        assert_eq!(reg.opcode().unwrap(), Opcode::WriteFrame);
    }

    #[test]
    fn test_wire_is_big_endian() {
        let reg = Register::request(Opcode::LoadCartridge, 2, 0);
        let mut buf = BytesMut::new();
        reg.put(&mut buf);
        assert_eq!(buf.len(), REGISTER_SIZE);
        assert_eq!(buf[0], Opcode::LoadCartridge.as_u8());
        assert_eq!(&buf[..], &reg.to_u64().to_be_bytes());

        let back = Register::take(&mut buf).unwrap();
        assert_eq!(back, reg);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_take_incomplete() {
        let mut buf = BytesMut::from(&[0u8, 1, 2][..]);
        assert!(Register::take(&mut buf).is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_respond_sets_status() {
        let reg = Register::request(Opcode::ReadFrame, 0, 12);
        assert!(reg.respond(true).is_ok());
        let failed = reg.respond(false);
        assert!(!failed.is_ok());
        assert_eq!(failed.frame, 12);
    }
}
