use cartfs_proto::{RegisterReader, RegisterWriter};
use cartfs_transport::CartStream;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::Result;

/// An open controller connection, split into reading and writing halves.
#[derive(Debug)]
pub struct Connection {
    pub(crate) reader: RegisterReader<CartStream>,
    pub(crate) writer: RegisterWriter<CartStream>,
}

impl Connection {
    /// Shut the socket down. Both halves share it.
    pub fn close(self) -> Result<()> {
        self.writer.into_inner().shutdown()?;
        Ok(())
    }
}

/// Connect to the configured controller endpoint (blocking).
pub fn connect(config: &ClientConfig) -> Result<Connection> {
    let stream = cartfs_transport::connect(&config.endpoint)?;
    stream.set_read_timeout(config.read_timeout())?;
    stream.set_write_timeout(config.write_timeout())?;
    let reader_stream = stream.try_clone()?;

    info!(
        endpoint = %config.endpoint,
        transport = stream.transport_name(),
        "connected to cartridge controller"
    );

    Ok(Connection {
        reader: RegisterReader::new(reader_stream),
        writer: RegisterWriter::new(stream),
    })
}
