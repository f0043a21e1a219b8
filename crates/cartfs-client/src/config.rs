use std::time::Duration;

use cartfs_transport::Endpoint;
use serde::{Deserialize, Serialize};

/// Controller connection settings.
///
/// Timeouts are unset by default: a request blocks until the controller
/// answers or the socket fails.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Controller address.
    pub endpoint: Endpoint,
    /// Socket read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Socket write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}
