use std::fmt;
use std::io;

use cartfs_cache::CacheError;
use cartfs_client::ClientError;
use cartfs_driver::DriverError;
use cartfs_proto::ProtoError;
use cartfs_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        other @ TransportError::InvalidEndpoint(_) => {
            CliError::new(USAGE, format!("{context}: {other}"))
        }
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Proto(ProtoError::Io(source)) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn driver_error(context: &str, err: DriverError) -> CliError {
    match err {
        DriverError::Transport(err) => client_error(context, err),
        DriverError::Protocol { .. } => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        DriverError::RemoteFailure { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        DriverError::FileTooLarge { .. } | DriverError::DeviceFull | DriverError::TooManyFiles(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DriverError::Config(_)
        | DriverError::InvalidArgument(_)
        | DriverError::Cache(CacheError::ZeroCapacity) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_connection_is_failure() {
        let err = DriverError::Transport(ClientError::Transport(TransportError::Connect {
            endpoint: "tcp://127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        }));
        assert_eq!(driver_error("probe", err).code, FAILURE);
    }

    #[test]
    fn read_timeout_is_timeout() {
        let err = DriverError::Transport(ClientError::Proto(ProtoError::Io(io::Error::from(
            io::ErrorKind::WouldBlock,
        ))));
        assert_eq!(driver_error("probe", err).code, TIMEOUT);
    }

    #[test]
    fn short_response_is_transport_error() {
        let err = DriverError::Transport(ClientError::Proto(ProtoError::ConnectionClosed));
        let cli = driver_error("read", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("read: "));
    }

    #[test]
    fn capacity_errors_are_data_invalid() {
        assert_eq!(driver_error("put", DriverError::DeviceFull).code, DATA_INVALID);
        let err = DriverError::FileTooLarge {
            name: "big".to_string(),
            max_frames: 4,
        };
        assert_eq!(driver_error("put", err).code, DATA_INVALID);
    }

    #[test]
    fn zero_cache_is_usage() {
        let err = DriverError::Cache(CacheError::ZeroCapacity);
        assert_eq!(driver_error("selftest", err).code, USAGE);
    }
}
