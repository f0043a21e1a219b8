//! In-memory cartridge controller.
//!
//! Answers every command the way a real controller does, without a socket.
//! Frames are zero until written. Used by tests and the `selftest` command.

use std::collections::HashMap;
use std::io;

use bytes::Bytes;
use cartfs_proto::{
    CartridgeId, FrameId, Opcode, Register, FRAMES_PER_CARTRIDGE, FRAME_SIZE, MAX_CARTRIDGES,
};
use cartfs_transport::TransportError;
use tracing::warn;

use crate::bus::{CartBus, Request, Response};
use crate::error::Result;

/// A failure to inject on a chosen request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer with the status bit set.
    Status,
    /// Fail delivery as if the socket broke.
    Disconnect,
}

/// RAM-backed controller.
#[derive(Debug)]
pub struct LoopbackController {
    max_cartridges: u16,
    frames_per_cartridge: u16,
    initialized: bool,
    loaded: Option<CartridgeId>,
    frames: HashMap<(CartridgeId, FrameId), Bytes>,
    log: Vec<Register>,
    faults: HashMap<usize, Fault>,
}

impl Default for LoopbackController {
    fn default() -> Self {
        Self::new(MAX_CARTRIDGES, FRAMES_PER_CARTRIDGE)
    }
}

impl LoopbackController {
    /// Create a controller with the given geometry.
    pub fn new(max_cartridges: u16, frames_per_cartridge: u16) -> Self {
        Self {
            max_cartridges,
            frames_per_cartridge,
            initialized: false,
            loaded: None,
            frames: HashMap::new(),
            log: Vec::new(),
            faults: HashMap::new(),
        }
    }

    /// Inject `fault` on the request with zero-based sequence number `nth`.
    pub fn fail_request(&mut self, nth: usize, fault: Fault) {
        self.faults.insert(nth, fault);
    }

    /// Every request register received, in order.
    pub fn requests(&self) -> &[Register] {
        &self.log
    }

    /// Opcodes of every request received, in order. Unknown opcodes are skipped.
    pub fn opcodes(&self) -> Vec<Opcode> {
        self.log.iter().filter_map(|reg| reg.opcode().ok()).collect()
    }

    /// Forget the request log.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Stored content of a frame, or `None` if it was never written.
    pub fn frame(&self, cartridge: CartridgeId, frame: FrameId) -> Option<&Bytes> {
        self.frames.get(&(cartridge, frame))
    }

    /// Frames holding written content.
    pub fn written_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn loaded_cartridge(&self) -> Option<CartridgeId> {
        self.loaded
    }

    fn execute(&mut self, request: &Request) -> (bool, Option<Bytes>) {
        let reg = request.register;
        let op = match reg.opcode() {
            Ok(op) => op,
            Err(_) => return (false, None),
        };

        if op != Opcode::Init && !self.initialized {
            return (false, zero_payload(op));
        }

        match op {
            Opcode::Init => {
                self.initialized = true;
                (true, None)
            }
            Opcode::LoadCartridge => {
                if reg.cartridge >= self.max_cartridges {
                    return (false, None);
                }
                self.loaded = Some(reg.cartridge);
                (true, None)
            }
            Opcode::ZeroFrame => match self.loaded {
                Some(cart) => {
                    self.frames.retain(|&(c, _), _| c != cart);
                    (true, None)
                }
                None => (false, None),
            },
            Opcode::ReadFrame => match self.frame_slot(reg.frame) {
                Some(key) => {
                    let payload = self
                        .frames
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| Bytes::from(vec![0u8; FRAME_SIZE]));
                    (true, Some(payload))
                }
                None => (false, zero_payload(op)),
            },
            Opcode::WriteFrame => match (self.frame_slot(reg.frame), &request.payload) {
                (Some(key), Some(payload)) if payload.len() == FRAME_SIZE => {
                    self.frames.insert(key, payload.clone());
                    (true, None)
                }
                _ => (false, None),
            },
            Opcode::PowerOff => {
                self.initialized = false;
                self.loaded = None;
                self.frames.clear();
                (true, None)
            }
        }
    }

    fn frame_slot(&self, frame: FrameId) -> Option<(CartridgeId, FrameId)> {
        match self.loaded {
            Some(cart) if frame < self.frames_per_cartridge => Some((cart, frame)),
            _ => None,
        }
    }
}

fn zero_payload(op: Opcode) -> Option<Bytes> {
    op.receives_frame()
        .then(|| Bytes::from(vec![0u8; FRAME_SIZE]))
}

impl CartBus for LoopbackController {
    fn request(&mut self, request: Request) -> Result<Response> {
        let seq = self.log.len();
        self.log.push(request.register);

        match self.faults.remove(&seq) {
            Some(Fault::Disconnect) => {
                return Err(TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).into());
            }
            Some(Fault::Status) => {
                warn!(seq, "injected controller failure");
                let payload = request.register.opcode().ok().and_then(zero_payload);
                return Ok(Response {
                    register: request.register.respond(false),
                    payload,
                });
            }
            None => {}
        }

        let (ok, payload) = self.execute(&request);
        Ok(Response {
            register: request.register.respond(ok),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    fn ok(ctl: &mut LoopbackController, request: Request) -> Response {
        let response = ctl.request(request).unwrap();
        assert!(response.register.is_ok(), "{:?}", response.register);
        response
    }

    #[test]
    fn rejects_commands_before_init() {
        let mut ctl = LoopbackController::default();
        let response = ctl.request(Request::load_cartridge(0)).unwrap();
        assert!(!response.register.is_ok());

        let response = ctl.request(Request::read_frame(0)).unwrap();
        assert!(!response.register.is_ok());
        assert_eq!(response.payload.unwrap().len(), FRAME_SIZE);
    }

    #[test]
    fn write_then_read_frame() {
        let mut ctl = LoopbackController::default();
        ok(&mut ctl, Request::init());
        ok(&mut ctl, Request::load_cartridge(2));
        ok(&mut ctl, Request::write_frame(10, vec![0xEE; FRAME_SIZE]));

        let response = ok(&mut ctl, Request::read_frame(10));
        assert!(response.payload.unwrap().iter().all(|&b| b == 0xEE));
        assert!(ctl.frame(2, 10).is_some());
        assert!(ctl.frame(0, 10).is_none());
    }

    #[test]
    fn unwritten_frames_read_as_zero() {
        let mut ctl = LoopbackController::default();
        ok(&mut ctl, Request::init());
        ok(&mut ctl, Request::load_cartridge(0));
        let response = ok(&mut ctl, Request::read_frame(5));
        assert!(response.payload.unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_clears_only_loaded_cartridge() {
        let mut ctl = LoopbackController::default();
        ok(&mut ctl, Request::init());
        ok(&mut ctl, Request::load_cartridge(0));
        ok(&mut ctl, Request::write_frame(1, vec![1u8; FRAME_SIZE]));
        ok(&mut ctl, Request::load_cartridge(1));
        ok(&mut ctl, Request::write_frame(1, vec![2u8; FRAME_SIZE]));
        ok(&mut ctl, Request::zero_cartridge());

        assert!(ctl.frame(0, 1).is_some());
        assert!(ctl.frame(1, 1).is_none());
    }

    #[test]
    fn out_of_range_addresses_fail() {
        let mut ctl = LoopbackController::new(2, 4);
        ok(&mut ctl, Request::init());
        assert!(!ctl.request(Request::load_cartridge(2)).unwrap().register.is_ok());
        ok(&mut ctl, Request::load_cartridge(1));
        assert!(!ctl.request(Request::read_frame(4)).unwrap().register.is_ok());
        assert!(!ctl
            .request(Request::write_frame(4, vec![0u8; FRAME_SIZE]))
            .unwrap()
            .register
            .is_ok());
    }

    #[test]
    fn unknown_opcode_fails() {
        let mut ctl = LoopbackController::default();
        ok(&mut ctl, Request::init());
        let mut request = Request::init();
        request.register.primary = 0x7f;
        assert!(!ctl.request(request).unwrap().register.is_ok());
        assert_eq!(ctl.opcodes(), vec![Opcode::Init]);
        assert_eq!(ctl.requests().len(), 2);
    }

    #[test]
    fn power_off_forgets_everything() {
        let mut ctl = LoopbackController::default();
        ok(&mut ctl, Request::init());
        ok(&mut ctl, Request::load_cartridge(0));
        ok(&mut ctl, Request::write_frame(0, vec![9u8; FRAME_SIZE]));
        ok(&mut ctl, Request::power_off());

        assert!(!ctl.is_initialized());
        assert_eq!(ctl.loaded_cartridge(), None);
        assert_eq!(ctl.written_frames(), 0);
    }

    #[test]
    fn injected_faults() {
        let mut ctl = LoopbackController::default();
        ctl.fail_request(1, Fault::Status);
        ctl.fail_request(2, Fault::Disconnect);

        ok(&mut ctl, Request::init());
        assert!(!ctl.request(Request::load_cartridge(0)).unwrap().register.is_ok());
        assert!(matches!(
            ctl.request(Request::load_cartridge(0)),
            Err(ClientError::Transport(_))
        ));
        ok(&mut ctl, Request::load_cartridge(0));
    }

    #[test]
    fn usable_through_mut_reference() {
        fn drive<B: CartBus>(mut bus: B) {
            bus.request(Request::init()).unwrap();
        }

        let mut ctl = LoopbackController::default();
        drive(&mut ctl);
        assert!(ctl.is_initialized());
    }
}
