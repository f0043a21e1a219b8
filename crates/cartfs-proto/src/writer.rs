use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{Register, FRAME_SIZE, REGISTER_SIZE};
use crate::error::{ProtoError, Result};

/// Writes request registers and frame payloads to any `Write` stream.
#[derive(Debug)]
pub struct RegisterWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> RegisterWriter<T> {
    /// Create a new register writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(REGISTER_SIZE + FRAME_SIZE),
        }
    }

    /// Send a bare register (blocking).
    pub fn send_register(&mut self, reg: &Register) -> Result<()> {
        self.buf.clear();
        reg.put(&mut self.buf);
        self.write_buffered()
    }

    /// Send a register followed by exactly one frame of payload (blocking).
    pub fn send_register_with_frame(&mut self, reg: &Register, frame: &[u8]) -> Result<()> {
        if frame.len() != FRAME_SIZE {
            return Err(ProtoError::PayloadSize {
                size: frame.len(),
                expected: FRAME_SIZE,
            });
        }

        self.buf.clear();
        reg.put(&mut self.buf);
        self.buf.extend_from_slice(frame);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(ProtoError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
