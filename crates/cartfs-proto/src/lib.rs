//! Opcode register codec for the cartridge controller protocol.
//!
//! Every exchange with the controller is one 64-bit register, sent in
//! network byte order, optionally followed (writes) or preceded by the
//! response register (reads) by exactly one raw frame of payload:
//! - 8 bits primary opcode
//! - 8 bits secondary opcode (reserved)
//! - 1 bit status (0 = success)
//! - 16 bits cartridge id
//! - 16 bits frame id
//! - 15 low bits unused
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod writer;

pub use codec::{
    decode, encode, CartridgeId, FrameId, Register, FRAMES_PER_CARTRIDGE, FRAME_SIZE,
    MAX_CARTRIDGES, REGISTER_SIZE,
};
pub use error::{ProtoError, Result};
pub use opcode::Opcode;
pub use reader::RegisterReader;
pub use writer::RegisterWriter;
