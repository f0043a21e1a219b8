//! Primary opcodes understood by the controller.
//!
//! Values are fixed by the controller protocol; 6 and above are unassigned.

use crate::error::ProtoError;

/// A controller command, dispatched on the primary opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Initialize the memory system.
    Init = 0,
    /// Load a cartridge; later frame commands address it.
    LoadCartridge = 1,
    /// Zero every frame of the loaded cartridge.
    ZeroFrame = 2,
    /// Read one frame of the loaded cartridge.
    ReadFrame = 3,
    /// Write one frame of the loaded cartridge.
    WriteFrame = 4,
    /// Power the controller off and drop the connection.
    PowerOff = 5,
}

impl Opcode {
    /// All opcodes in wire order.
    pub const ALL: [Opcode; 6] = [
        Opcode::Init,
        Opcode::LoadCartridge,
        Opcode::ZeroFrame,
        Opcode::ReadFrame,
        Opcode::WriteFrame,
        Opcode::PowerOff,
    ];

    /// Raw primary opcode byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short mnemonic used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Init => "INITMS",
            Opcode::LoadCartridge => "LDCART",
            Opcode::ZeroFrame => "BZERO",
            Opcode::ReadFrame => "RDFRME",
            Opcode::WriteFrame => "WRFRME",
            Opcode::PowerOff => "POWOFF",
        }
    }

    /// True if a frame payload follows the request register on the wire.
    pub fn sends_frame(self) -> bool {
        self == Opcode::WriteFrame
    }

    /// True if a frame payload follows the response register on the wire.
    pub fn receives_frame(self) -> bool {
        self == Opcode::ReadFrame
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .get(value as usize)
            .copied()
            .ok_or(ProtoError::UnknownOpcode(value))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_values_are_fixed() {
        let raw: Vec<u8> = Opcode::ALL.iter().map(|op| op.as_u8()).collect();
        assert_eq!(raw, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn try_from_rejects_unassigned() {
        assert_eq!(Opcode::try_from(3).unwrap(), Opcode::ReadFrame);
        assert!(matches!(
            Opcode::try_from(6),
            Err(ProtoError::UnknownOpcode(6))
        ));
        assert!(Opcode::try_from(0xff).is_err());
    }

    #[test]
    fn payload_direction() {
        assert!(Opcode::WriteFrame.sends_frame());
        assert!(!Opcode::WriteFrame.receives_frame());
        assert!(Opcode::ReadFrame.receives_frame());
        assert!(!Opcode::PowerOff.sends_frame());
    }
}
