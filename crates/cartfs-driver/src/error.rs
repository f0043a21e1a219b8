use cartfs_proto::{CartridgeId, FrameId, Opcode};

use crate::file::FileHandle;

/// Errors that can occur in driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The handle was never issued.
    #[error("invalid file handle {0}")]
    InvalidHandle(FileHandle),

    /// The handle names a closed file.
    #[error("file {0:?} is not open")]
    FileNotOpen(String),

    /// The file is already open.
    #[error("file {0:?} is already open")]
    AlreadyOpen(String),

    /// An argument is out of range (e.g. seeking past end of file).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The controller answered with something that does not fit the request.
    #[error("protocol error on {op}: {reason}")]
    Protocol { op: Opcode, reason: String },

    /// The controller set the status bit.
    #[error("controller rejected {op} (cartridge {cartridge}, frame {frame})")]
    RemoteFailure {
        op: Opcode,
        cartridge: CartridgeId,
        frame: FrameId,
    },

    /// Request delivery failed.
    #[error("transport error: {0}")]
    Transport(#[from] cartfs_client::ClientError),

    /// Cache configuration or fill error.
    #[error("cache error: {0}")]
    Cache(#[from] cartfs_cache::CacheError),

    /// The file table is full.
    #[error("file table full ({0} files)")]
    TooManyFiles(usize),

    /// A write would grow the file past its frame limit.
    #[error("file {name:?} would exceed {max_frames} frames")]
    FileTooLarge { name: String, max_frames: usize },

    /// Every frame on every cartridge has been allocated.
    #[error("no free frames left on the device")]
    DeviceFull,

    /// A frame inside the file length has no physical address.
    #[error("file {name:?} has no frame at index {index}")]
    MissingFrame { name: String, index: usize },

    /// The driver configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;
