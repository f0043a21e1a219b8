use std::fs;
use std::path::Path;

use cartfs_client::ClientConfig;
use cartfs_driver::DriverConfig;
use cartfs_transport::Endpoint;
use serde::{Deserialize, Serialize};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};

/// Settings file passed with `--config`.
///
/// ```json
/// {
///   "client": { "endpoint": { "tcp": "127.0.0.1:19876" }, "read_timeout_ms": 5000 },
///   "driver": { "cache_capacity": 256 }
/// }
/// ```
///
/// Missing sections and fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub client: ClientConfig,
    pub driver: DriverConfig,
}

impl Settings {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
        Self::parse(&text).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("invalid config {}: {}", path.display(), err.message),
            )
        })
    }

    fn parse(text: &str) -> CliResult<Self> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|err| CliError::new(DATA_INVALID, err.to_string()))?;
        settings
            .driver
            .validate()
            .map_err(|err| CliError::new(USAGE, err.to_string()))?;
        Ok(settings)
    }

    /// Command-line endpoint wins over the file.
    pub fn override_endpoint(&mut self, endpoint: Option<Endpoint>) {
        if let Some(endpoint) = endpoint {
            self.client.endpoint = endpoint;
        }
    }
}
