/// Errors that can occur configuring or filling the frame cache.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity must be at least one frame.
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,

    /// Only whole frames can be cached.
    #[error("cached block is {size} bytes, expected {expected}")]
    FrameSize { size: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, CacheError>;
