/// Errors that can occur while exchanging registers with a controller.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The primary opcode does not name a known controller command.
    #[error("unknown primary opcode {0}")]
    UnknownOpcode(u8),

    /// A frame payload was not exactly one frame long.
    #[error("frame payload is {size} bytes, expected {expected}")]
    PayloadSize { size: usize, expected: usize },

    /// An I/O error occurred while reading or writing registers.
    #[error("register I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete register or frame moved.
    #[error("connection closed (short transfer)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, ProtoError>;
