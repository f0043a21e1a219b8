use std::net::{SocketAddr, TcpStream};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::CartStream;

/// Connect to a controller listening on a TCP address (blocking).
///
/// Nagle is disabled: every request is a small register that the
/// controller must see before it answers.
pub fn connect(addr: SocketAddr) -> Result<CartStream> {
    let stream = TcpStream::connect(addr).map_err(|e| TransportError::Connect {
        endpoint: addr.to_string(),
        source: e,
    })?;
    stream.set_nodelay(true)?;
    debug!(%addr, "connected to controller over tcp");
    Ok(CartStream::from_tcp(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            server.read_exact(&mut buf).unwrap();
            server.write_all(&buf).unwrap();
        });

        let mut client = connect(addr).unwrap();
        client.write_all(b"hello").unwrap();
        let mut echoed = [0u8; 5];
        client.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to obtain a port with nobody listening.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let result = connect(addr);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
