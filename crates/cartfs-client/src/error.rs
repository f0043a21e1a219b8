/// Errors that can occur exchanging requests with a controller.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, socket options).
    #[error("transport error: {0}")]
    Transport(#[from] cartfs_transport::TransportError),

    /// Register or frame exchange failed mid-request.
    #[error("protocol error: {0}")]
    Proto(#[from] cartfs_proto::ProtoError),

    /// A write-frame request carried no frame payload.
    #[error("write-frame request for frame {0} has no payload")]
    MissingPayload(u16),
}

pub type Result<T> = std::result::Result<T, ClientError>;
