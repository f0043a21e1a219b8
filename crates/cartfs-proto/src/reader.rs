use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{Register, FRAME_SIZE, REGISTER_SIZE};
use crate::error::{ProtoError, Result};

const INITIAL_BUFFER_CAPACITY: usize = REGISTER_SIZE + FRAME_SIZE;

/// Reads response registers and frame payloads from any `Read` stream.
///
/// Handles partial reads internally; callers always get a complete
/// register or a complete frame, never a prefix.
#[derive(Debug)]
pub struct RegisterReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> RegisterReader<T> {
    /// Create a new register reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next register (blocking).
    ///
    /// Returns `Err(ProtoError::ConnectionClosed)` on EOF mid-register.
    pub fn read_register(&mut self) -> Result<Register> {
        self.fill(REGISTER_SIZE)?;
        Register::take(&mut self.buf).ok_or(ProtoError::ConnectionClosed)
    }

    /// Read exactly one frame of payload (blocking).
    pub fn read_frame(&mut self) -> Result<Bytes> {
        self.fill(FRAME_SIZE)?;
        Ok(self.buf.split_to(FRAME_SIZE).freeze())
    }

    fn fill(&mut self, want: usize) -> Result<()> {
        while self.buf.len() < want {
            let mut chunk = [0u8; FRAME_SIZE];
            // Never read past what was asked for; the next bytes belong to
            // a later exchange.
            let missing = want - self.buf.len();
            let read = match self.inner.read(&mut chunk[..missing]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            };

            if read == 0 {
                return Err(ProtoError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
