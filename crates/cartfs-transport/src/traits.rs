use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected controller stream implementing Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
/// Wraps either a TCP stream or, on Unix, a Unix domain socket stream.
pub struct CartStream {
    inner: CartStreamInner,
}

enum CartStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for CartStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            CartStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            CartStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for CartStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            CartStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            CartStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            CartStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            CartStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl CartStream {
    /// Create a CartStream from a TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: CartStreamInner::Tcp(stream),
        }
    }

    /// Create a CartStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: CartStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            CartStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            CartStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            CartStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            CartStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            CartStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            #[cfg(unix)]
            CartStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both halves of the connection.
    ///
    /// Already-disconnected peers are not an error.
    pub fn shutdown(&self) -> Result<()> {
        let res = match &self.inner {
            CartStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            CartStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match res {
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            other => other.map_err(Into::into),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            CartStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            CartStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl std::fmt::Debug for CartStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            CartStreamInner::Tcp(stream) => f
                .debug_struct("CartStream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
            #[cfg(unix)]
            CartStreamInner::Unix(_) => f.debug_struct("CartStream").field("type", &"unix").finish(),
        }
    }
}
