//! Blocking stream transport to a remote cartridge controller.
//!
//! Provides a single connected stream type over the socket families the
//! controller can listen on:
//! - TCP (default, `127.0.0.1:19876`)
//! - Unix domain sockets (Linux/macOS)
//!
//! This is the lowest layer of cartfs. Everything else builds on top of
//! the [`CartStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use endpoint::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use traits::CartStream;

/// Connect to `endpoint` (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<CartStream> {
    match endpoint {
        Endpoint::Tcp(addr) => tcp::connect(*addr),
        #[cfg(unix)]
        Endpoint::Unix(path) => uds::connect(path),
    }
}
