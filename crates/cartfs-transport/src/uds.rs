use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::CartStream;

/// Connect to a controller listening on a Unix domain socket (blocking).
pub fn connect(path: impl AsRef<Path>) -> Result<CartStream> {
    let path = path.as_ref();
    let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
        endpoint: path.display().to_string(),
        source: e,
    })?;
    debug!(?path, "connected to controller over unix domain socket");
    Ok(CartStream::from_unix(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;

    #[test]
    fn test_connect_and_exchange() {
        let dir = std::env::temp_dir().join(format!("cartfs-uds-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("controller.sock");
        let _ = std::fs::remove_file(&sock_path);

        let listener = UnixListener::bind(&sock_path).unwrap();
        let handle = std::thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            server.write_all(b"ready").unwrap();
        });

        let mut client = connect(&sock_path).unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ready");

        handle.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_connect_missing_path() {
        let result = connect("/nonexistent/cartfs/controller.sock");
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
