use bytes::Bytes;
use cartfs_proto::{CartridgeId, FrameId, Opcode, Register};

use crate::error::Result;

/// One controller command: a register and, for writes, a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub register: Register,
    pub payload: Option<Bytes>,
}

impl Request {
    /// A bare command with no payload.
    pub fn new(op: Opcode, cartridge: CartridgeId, frame: FrameId) -> Self {
        Self {
            register: Register::request(op, cartridge, frame),
            payload: None,
        }
    }

    pub fn init() -> Self {
        Self::new(Opcode::Init, 0, 0)
    }

    pub fn load_cartridge(cartridge: CartridgeId) -> Self {
        Self::new(Opcode::LoadCartridge, cartridge, 0)
    }

    pub fn zero_cartridge() -> Self {
        Self::new(Opcode::ZeroFrame, 0, 0)
    }

    /// Read a frame of the loaded cartridge.
    pub fn read_frame(frame: FrameId) -> Self {
        Self::new(Opcode::ReadFrame, 0, frame)
    }

    /// Write a frame of the loaded cartridge.
    pub fn write_frame(frame: FrameId, payload: impl Into<Bytes>) -> Self {
        Self {
            register: Register::request(Opcode::WriteFrame, 0, frame),
            payload: Some(payload.into()),
        }
    }

    pub fn power_off() -> Self {
        Self::new(Opcode::PowerOff, 0, 0)
    }
}

/// The controller's answer: a register and, for reads, a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub register: Register,
    pub payload: Option<Bytes>,
}

/// Anything that can carry a request to a controller and return its answer.
///
/// Implementations report only delivery failures as errors; a controller
/// refusing a command shows up as the status bit of the response register.
pub trait CartBus {
    fn request(&mut self, request: Request) -> Result<Response>;
}

impl<B: CartBus + ?Sized> CartBus for &mut B {
    fn request(&mut self, request: Request) -> Result<Response> {
        (**self).request(request)
    }
}

impl<B: CartBus + ?Sized> CartBus for Box<B> {
    fn request(&mut self, request: Request) -> Result<Response> {
        (**self).request(request)
    }
}
